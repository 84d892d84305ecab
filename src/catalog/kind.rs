/// Table and error vocabulary for one catalog.
pub trait CatalogKind: Send + Sync + 'static {
    const TABLE: &'static str;
    const PATH: &'static str;
    const NAME: &'static str;
    const NOT_FOUND: &'static str;
    const IN_USE: &'static str;
}

pub struct FarmTasks;

impl CatalogKind for FarmTasks {
    const TABLE: &'static str = "farm_tasks";
    const PATH: &'static str = "/farm_tasks";
    const NAME: &'static str = "Farm task";
    const NOT_FOUND: &'static str = "FARM_TASK_NOT_FOUND";
    const IN_USE: &'static str = "FARM_TASK_IN_USE";
}

pub struct Tools;

impl CatalogKind for Tools {
    const TABLE: &'static str = "tools";
    const PATH: &'static str = "/tools";
    const NAME: &'static str = "Tool";
    const NOT_FOUND: &'static str = "TOOL_NOT_FOUND";
    const IN_USE: &'static str = "TOOL_IN_USE";
}
