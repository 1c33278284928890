use sea_orm::entity::prelude::*;

/// Sea-ORM Entity for the messages table
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    /// `TIMESTAMP DEFAULT CURRENT_TIMESTAMP`, nullable in the schema
    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Message {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            content: model.content,
            created_at: model.created_at,
        }
    }
}
