//! 存储层：SeaORM 后端与领域模型

pub mod backend;
pub mod models;

pub use backend::SeaOrmStorage;
pub use models::{
    ClickStats, DailyClicks, DeviceClicks, Folder, Link, LinkFilter, LinkPatch, MonthlyClicks,
    NewLink, ReferrerClicks,
};
