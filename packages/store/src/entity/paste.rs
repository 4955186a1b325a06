use common::{Paste, PasteKind, RoomCode};
use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "paste")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Room PIN. Immutable after creation.
    pub room_code: String,

    /// Text, or the public URL of an image blob.
    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(column_name = "type")]
    pub kind: PasteKind,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Paste {
    fn from(model: Model) -> Self {
        Paste {
            id: model.id,
            room_code: RoomCode::new_unchecked(model.room_code),
            content: model.content,
            kind: model.kind,
            created_at: model.created_at,
        }
    }
}
