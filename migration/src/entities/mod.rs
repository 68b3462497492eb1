pub mod click_event;
pub mod folder;
pub mod link;

pub use click_event::Entity as ClickEventEntity;
pub use folder::Entity as FolderEntity;
pub use link::Entity as LinkEntity;
