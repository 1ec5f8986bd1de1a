//! Demo: one GetFile conversation against simulated pillars.
//!
//! Reads the usual `PILLAR_CONVERSATIONS__*` configuration, attaches a
//! simulated pillar for every configured contributor to an in-memory bus and
//! performs one blocking GetFile with the fastest-pillar selector.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use pillar_conversations::adapters::{
    IdentifyBehavior, InMemoryMessageBus, OperationBehavior, SimulatedContributor,
    TokioTimerService,
};
use pillar_conversations::application::{ConversationClient, ConversationMediator};
use pillar_conversations::config::AppConfig;
use pillar_conversations::domain::conversation::{
    ConversationContext, OperationKind, SelectionPolicy,
};
use pillar_conversations::domain::foundation::Destination;
use pillar_conversations::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    telemetry::init_tracing(&config.logging);
    config.validate()?;

    let settings = &config.client;
    let bus = Arc::new(InMemoryMessageBus::new());
    let collection_destination = settings.collection_destination()?;

    for (index, contributor) in settings.contributors()?.into_iter().enumerate() {
        let destination = Destination::new(format!("{}.queue", contributor))?;
        let estimate = Duration::from_millis(100 * (index as u64 + 1));
        let pillar = Arc::new(
            SimulatedContributor::new(contributor.clone(), destination, bus.clone())
                .with_identify(IdentifyBehavior::Positive {
                    estimate: Some(estimate),
                })
                .with_operation(OperationBehavior::Complete {
                    progress_updates: 1,
                    delay: estimate / 2,
                    payload: json!({ "url": format!("http://{}/files/demo", contributor) }),
                }),
        );
        pillar.attach(&collection_destination);
    }

    let mediator = Arc::new(ConversationMediator::new(
        bus.clone(),
        settings.receiver_destination()?,
        settings.mediator_config(),
    ));
    mediator.start();

    let context = ConversationContext::new(
        settings.conversation_settings()?,
        bus.clone(),
        Arc::new(TokioTimerService::new()),
    );
    let client = ConversationClient::new(
        context,
        mediator.clone(),
        settings.collection_id()?,
        settings.contributors()?,
    );

    let request = client.request(OperationKind::GetFile).with_file_id("demo");
    let outcome = client.perform(request, &SelectionPolicy::Fastest).await;
    mediator.shutdown().await;

    match outcome {
        Ok(results) => {
            for result in results {
                tracing::info!(
                    contributor = %result.contributor,
                    payload = %result.payload,
                    "GetFile delivered"
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "GetFile failed");
            Err(e.into())
        }
    }
}
