pub mod skills_pipeline;
pub mod world_pipeline;

pub use skills_pipeline::SkillsPipeline;
pub use world_pipeline::WorldPipeline;
