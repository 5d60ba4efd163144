use telemetry_tasks::{ComputationParams, PollingConfig};

#[derive(Clone, Debug)]
pub struct CLIConfig {
    pub polling: PollingConfig,
    pub params: ComputationParams,
}
