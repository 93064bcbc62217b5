use sandglass_infra::SandglassContext;
use std::fmt::Debug;
use tracing::{error, Instrument};

/// Follow-up work attached to a `UseCase`, fed the response once the
/// execution has committed. Subscribers run after the fact and can no longer
/// change what the caller gets back, so anything that must be able to fail
/// the request belongs in `execute` itself.
#[async_trait::async_trait(?Send)]
pub trait Subscriber<U: UseCase> {
    async fn notify(&self, response: &U::Response, ctx: &SandglassContext);
}

#[async_trait::async_trait(?Send)]
pub trait UseCase: Debug {
    type Response;
    type Error;

    /// Label for the tracing span wrapped around every execution.
    const NAME: &'static str;

    async fn execute(&mut self, ctx: &SandglassContext) -> Result<Self::Response, Self::Error>;

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        Default::default()
    }
}

/// Runs a usecase inside its own tracing span. On success the response is
/// handed to each registered subscriber in order; on failure the error is
/// logged here once so controllers only have to map it.
pub async fn execute<U>(mut usecase: U, ctx: &SandglassContext) -> Result<U::Response, U::Error>
where
    U: UseCase,
    U::Error: Debug,
{
    let span = tracing::info_span!("usecase", usecase = U::NAME);
    async {
        match usecase.execute(ctx).await {
            Ok(response) => {
                for subscriber in U::subscribers() {
                    subscriber.notify(&response, ctx).await;
                }
                Ok(response)
            }
            Err(e) => {
                error!("{} usecase failed: {:?}", U::NAME, e);
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}
