pub mod etl;
pub mod inventory;
pub mod skills;
pub mod world;

pub use crate::domain::model::{ChestItem, ItemTotals, ReportTable, Role, SkillLevels};
pub use crate::domain::ports::{
    ConfigProvider, Extracted, Fingerprint, Pipeline, ReportSink, Storage, WorldExporter,
};
pub use crate::utils::error::Result;
