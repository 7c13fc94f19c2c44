use std::future::Future;

use super::{
    error::ToolError,
    request::{ApiRequest, ApiResponse},
};

/// Outbound side of the dispatch adapter: executes one request against the
/// management API.
pub trait PlatformApi: Send + Sync + 'static {
    fn execute(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, ToolError>> + Send;
}
