pub mod api;
pub mod model;
pub mod retrier;

pub use api::{ApiError, CompareCall, PredictCall, PredictionClient, TeamsCall};
pub use model::{
    ComparisonRequest, ComparisonResponse, PredictionRequest, PredictionResponse, TeamDirectory,
};
pub use retrier::{
    ColdStartSink, ErrorKind, RequestError, RequestPolicy, RequestRetrier, RetryableCall,
};
