pub mod reinforcement;
pub mod response;
pub mod verification;

pub use reinforcement::ReinforcementState;
pub use response::{
    CancelData, ClearLogsData, ErrorResponse, LogEntry, LogsData, StartedData, StatusData,
    SuccessResponse,
};
pub use verification::{VerificationLoop, DEFAULT_COMPLETION_PROMISE};
