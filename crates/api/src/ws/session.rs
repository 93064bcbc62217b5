use crate::shared::usecase::execute;
use crate::timer::{
    ChangeTargetTimeUseCase, CompleteTimerUseCase, CompletionTrigger, GetTimerUseCase,
    SaveTimestampUseCase, TimerLookup,
};
use crate::ws::hub::SessionHub;
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use sandglass_api_structs::{ClientCommand, TimerResponse};
use sandglass_domain::{derived_user_id, TimerEvent, ID};
use sandglass_infra::SandglassContext;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// One viewer connection. Client commands arrive as tagged JSON frames;
/// server pushes are `TimerEvent` envelopes drained from the session's hub
/// channel.
pub struct TimerSocket {
    session_id: String,
    user_id: String,
    context: SandglassContext,
    hub: Arc<SessionHub>,
    last_client_beat: Instant,
}

impl TimerSocket {
    pub fn new(context: SandglassContext, hub: Arc<SessionHub>, user_id: Option<String>) -> Self {
        let session_id = ID::new().as_string();
        // Connections without a userId get a stable one derived from the
        // session id.
        let user_id = user_id.unwrap_or_else(|| derived_user_id(&session_id));
        Self {
            session_id,
            user_id,
            context,
            hub,
            last_client_beat: Instant::now(),
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_client_beat) > CLIENT_TIMEOUT {
                info!(
                    "Session {} missed heartbeats. Disconnecting.",
                    act.session_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn on_client_beat(&mut self) {
        self.last_client_beat = Instant::now();
        let context = self.context.clone();
        let session_id = self.session_id.clone();
        actix_web::rt::spawn(async move {
            let now = context.sys.now();
            if let Err(e) = context.presence.heartbeat(&session_id, now).await {
                warn!("Heartbeat refresh for session {} failed: {}", session_id, e);
            }
        });
    }

    fn dispatch(&self, command: ClientCommand) {
        let context = self.context.clone();
        let hub = self.hub.clone();
        let session_id = self.session_id.clone();
        let user_id = self.user_id.clone();

        actix_web::rt::spawn(async move {
            match command {
                ClientCommand::Subscribe { timer_id } => {
                    subscribe_flow(context, hub, session_id, user_id, timer_id).await;
                }
                ClientCommand::Save {
                    timer_id,
                    target_time,
                    metadata,
                } => {
                    let usecase = SaveTimestampUseCase {
                        timer_id: timer_id.clone(),
                        user_id,
                        target_time,
                        metadata,
                    };
                    if let Err(e) = execute(usecase, &context).await {
                        error!("Saving timestamp for timer {} failed: {:?}", timer_id, e);
                    }
                }
                ClientCommand::ChangeTarget {
                    timer_id,
                    new_target_time,
                } => {
                    let usecase = ChangeTargetTimeUseCase {
                        timer_id: timer_id.clone(),
                        new_target_time,
                        changed_by: user_id,
                    };
                    if let Err(e) = execute(usecase, &context).await {
                        error!("Changing target of timer {} failed: {:?}", timer_id, e);
                    }
                }
                ClientCommand::Complete { timer_id } => {
                    let usecase = CompleteTimerUseCase {
                        timer_id: timer_id.clone(),
                        trigger: CompletionTrigger::User(user_id),
                    };
                    if let Err(e) = execute(usecase, &context).await {
                        error!("Completing timer {} failed: {:?}", timer_id, e);
                    }
                }
            }
        });
    }
}

impl Actor for TimerSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            "Session {} connected (user_id={})",
            self.session_id, self.user_id
        );
        let outbound = self.hub.register(&self.session_id);
        ctx.add_stream(UnboundedReceiverStream::new(outbound));
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("Session {} disconnected", self.session_id);
        self.hub.unregister(&self.session_id);
        actix_web::rt::spawn(disconnect_flow(
            self.context.clone(),
            self.hub.clone(),
            self.session_id.clone(),
        ));
    }
}

/// Outbound frames from the hub.
impl StreamHandler<String> for TimerSocket {
    fn handle(&mut self, payload: String, ctx: &mut Self::Context) {
        ctx.text(payload);
    }

    fn finished(&mut self, _ctx: &mut Self::Context) {
        // The hub dropped this session; the socket itself decides when to
        // close.
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for TimerSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.on_client_beat();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.on_client_beat();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientCommand>(&text) {
                Ok(command) => self.dispatch(command),
                Err(e) => {
                    debug!(
                        "Session {} sent an unparseable frame: {}",
                        self.session_id, e
                    );
                    let _ = self.hub.push_to(
                        &self.session_id,
                        format!(r#"{{"error":"BadFrame","message":"{}"}}"#, e),
                    );
                }
            },
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Session {} protocol error: {}", self.session_id, e);
                ctx.stop();
            }
        }
    }
}

/// Subscribes a session to a timer: presence record, USER_JOINED (exactly
/// once per session start), state snapshot to the joiner, owner alert for
/// share-link access, and a local online-count broadcast.
async fn subscribe_flow(
    context: SandglassContext,
    hub: Arc<SessionHub>,
    session_id: String,
    user_id: String,
    timer_id: ID,
) {
    let server_id = context.config.server_instance_id.clone();

    let previous = hub.subscription(&session_id);
    if previous.as_ref() == Some(&timer_id) {
        // Re-subscribing to the same timer only refreshes the snapshot.
        push_snapshot(&context, &hub, &session_id, &user_id, &timer_id).await;
        return;
    }
    if previous.is_some() {
        // The session moved to another timer; close out the old viewership.
        disconnect_flow(context.clone(), hub.clone(), session_id.clone()).await;
    }

    let timer = match context.repos.timers.find(&timer_id).await {
        Some(timer) => timer,
        None => {
            let _ = hub.push_to(
                &session_id,
                format!(
                    r#"{{"error":"NotFound","message":"Timer {} was not found"}}"#,
                    timer_id
                ),
            );
            return;
        }
    };

    let now = context.sys.now();
    if let Err(e) = context
        .presence
        .record_connection(&timer_id, &user_id, &server_id, &session_id, now)
        .await
    {
        error!("Recording connection for session {} failed: {}", session_id, e);
        return;
    }
    hub.set_subscription(&session_id, &timer_id);
    info!(
        "Session {} subscribed to timer {} (user_id={})",
        session_id, timer_id, user_id
    );

    let joined = TimerEvent::UserJoined {
        event_id: ID::new(),
        timer_id: timer_id.clone(),
        timestamp: now,
        origin_server_id: server_id.clone(),
        user_id: user_id.clone(),
        server_id: server_id.clone(),
    };
    if let Err(e) = context.bus.publish(&joined).await {
        error!("Publishing USER_JOINED for timer {} failed: {}", timer_id, e);
    }

    push_snapshot(&context, &hub, &session_id, &user_id, &timer_id).await;

    if timer.owner_id != user_id {
        let accessed = TimerEvent::SharedTimerAccessed {
            event_id: ID::new(),
            timer_id: timer_id.clone(),
            timestamp: now,
            origin_server_id: server_id,
            accessed_user_id: user_id,
            owner_id: timer.owner_id.clone(),
        };
        if let Err(e) = context.bus.publish(&accessed).await {
            error!(
                "Publishing SHARED_TIMER_ACCESSED for timer {} failed: {}",
                timer_id, e
            );
        }
    }

    broadcast_online_count(&context, &hub, &timer_id).await;
}

/// Reverses a session's presence on disconnect and tells the fleet.
async fn disconnect_flow(context: SandglassContext, hub: Arc<SessionHub>, session_id: String) {
    match context.presence.remove_connection(&session_id).await {
        Ok(Some(session)) => {
            let left = TimerEvent::UserLeft {
                event_id: ID::new(),
                timer_id: session.timer_id.clone(),
                timestamp: context.sys.now(),
                origin_server_id: context.config.server_instance_id.clone(),
                user_id: session.user_id,
                server_id: session.server_id,
            };
            if let Err(e) = context.bus.publish(&left).await {
                error!(
                    "Publishing USER_LEFT for timer {} failed: {}",
                    session.timer_id, e
                );
            }
            broadcast_online_count(&context, &hub, &session.timer_id).await;
        }
        Ok(None) => {
            // The session state already decayed; nothing to reverse.
        }
        Err(e) => error!("Removing connection for session {} failed: {}", session_id, e),
    }
}

async fn push_snapshot(
    context: &SandglassContext,
    hub: &SessionHub,
    session_id: &str,
    user_id: &str,
    timer_id: &ID,
) {
    let usecase = GetTimerUseCase {
        lookup: TimerLookup::ById(timer_id.clone()),
        user_id: Some(user_id.to_string()),
    };
    match execute(usecase, context).await {
        Ok(res) => {
            let snapshot = TimerResponse::new(
                &res.timer,
                Some(user_id),
                context.sys.now(),
                res.online_user_count,
            );
            match serde_json::to_string(&snapshot) {
                Ok(payload) => {
                    let _ = hub.push_to(session_id, payload);
                }
                Err(e) => warn!("Could not serialize timer snapshot: {}", e),
            }
        }
        Err(e) => warn!("Snapshot for timer {} failed: {:?}", timer_id, e),
    }
}

/// The fleet-wide count comes from the presence index; the control message
/// itself stays local to this server's sessions.
async fn broadcast_online_count(context: &SandglassContext, hub: &SessionHub, timer_id: &ID) {
    let online_user_count = match context.presence.online_count(timer_id).await {
        Ok(count) => count,
        Err(e) => {
            warn!("Online count lookup failed for timer {}: {}", timer_id, e);
            return;
        }
    };
    let event = TimerEvent::OnlineUserCountUpdated {
        event_id: ID::new(),
        timer_id: timer_id.clone(),
        timestamp: context.sys.now(),
        origin_server_id: context.config.server_instance_id.clone(),
        online_user_count,
    };
    hub.publish(timer_id, &event);
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use sandglass_domain::{BusTopic, Timer};

    struct TestSetup {
        context: SandglassContext,
        hub: Arc<SessionHub>,
        timer: Timer,
    }

    async fn setup() -> TestSetup {
        let context = SandglassContext::create_inmemory();
        let now = Utc::now();
        let timer = Timer::new("owner", now + ChronoDuration::minutes(10), now);
        context.repos.timers.insert(&timer).await.unwrap();
        TestSetup {
            context,
            hub: Arc::new(SessionHub::new()),
            timer,
        }
    }

    #[actix_web::test]
    async fn subscribe_records_presence_and_joins_once() {
        let TestSetup { context, hub, timer } = setup().await;
        let mut user_actions = context.bus.subscribe(BusTopic::UserActions);
        let mut rx = hub.register("sess-1");

        subscribe_flow(
            context.clone(),
            hub.clone(),
            "sess-1".into(),
            "owner".into(),
            timer.id.clone(),
        )
        .await;

        assert_eq!(context.presence.online_count(&timer.id).await.unwrap(), 1);
        assert_eq!(hub.subscription("sess-1"), Some(timer.id.clone()));

        match user_actions.try_recv().unwrap() {
            TimerEvent::UserJoined { user_id, .. } => assert_eq!(user_id, "owner"),
            other => panic!("unexpected event: {:?}", other),
        }

        // The joiner got the state snapshot followed by the count update.
        let snapshot = rx.try_recv().unwrap();
        assert!(snapshot.contains("\"timer\""));
        let count = rx.try_recv().unwrap();
        assert!(count.contains("ONLINE_USER_COUNT_UPDATED"));

        // Re-subscribing to the same timer does not emit USER_JOINED again.
        subscribe_flow(
            context.clone(),
            hub.clone(),
            "sess-1".into(),
            "owner".into(),
            timer.id.clone(),
        )
        .await;
        assert!(user_actions.try_recv().is_err());
    }

    #[actix_web::test]
    async fn share_link_viewers_trigger_the_owner_alert() {
        let TestSetup { context, hub, timer } = setup().await;
        let mut timer_events = context.bus.subscribe(BusTopic::TimerEvents);
        let _rx = hub.register("sess-2");

        subscribe_flow(
            context.clone(),
            hub.clone(),
            "sess-2".into(),
            "visitor".into(),
            timer.id.clone(),
        )
        .await;

        match timer_events.try_recv().unwrap() {
            TimerEvent::SharedTimerAccessed {
                accessed_user_id,
                owner_id,
                ..
            } => {
                assert_eq!(accessed_user_id, "visitor");
                assert_eq!(owner_id, "owner");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[actix_web::test]
    async fn owner_subscription_does_not_trigger_the_alert() {
        let TestSetup { context, hub, timer } = setup().await;
        let mut timer_events = context.bus.subscribe(BusTopic::TimerEvents);
        let _rx = hub.register("sess-1");

        subscribe_flow(
            context.clone(),
            hub.clone(),
            "sess-1".into(),
            "owner".into(),
            timer.id.clone(),
        )
        .await;

        assert!(timer_events.try_recv().is_err());
    }

    #[actix_web::test]
    async fn subscribing_to_a_missing_timer_reports_an_error_frame() {
        let TestSetup { context, hub, .. } = setup().await;
        let mut rx = hub.register("sess-1");

        subscribe_flow(
            context.clone(),
            hub.clone(),
            "sess-1".into(),
            "u1".into(),
            ID::new(),
        )
        .await;

        let frame = rx.try_recv().unwrap();
        assert!(frame.contains("NotFound"));
        assert_eq!(hub.subscription("sess-1"), None);
    }

    #[actix_web::test]
    async fn disconnect_reverses_the_subscription() {
        let TestSetup { context, hub, timer } = setup().await;
        let _rx = hub.register("sess-1");
        let mut user_actions = context.bus.subscribe(BusTopic::UserActions);

        subscribe_flow(
            context.clone(),
            hub.clone(),
            "sess-1".into(),
            "u1".into(),
            timer.id.clone(),
        )
        .await;
        assert_eq!(context.presence.online_count(&timer.id).await.unwrap(), 1);
        let _ = user_actions.try_recv();

        hub.unregister("sess-1");
        disconnect_flow(context.clone(), hub.clone(), "sess-1".into()).await;

        assert_eq!(context.presence.online_count(&timer.id).await.unwrap(), 0);
        match user_actions.try_recv().unwrap() {
            TimerEvent::UserLeft { user_id, .. } => assert_eq!(user_id, "u1"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
