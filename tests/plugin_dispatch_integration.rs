//! End-to-end dispatch between plugins
//!
//! Two plugins register method listeners derived from declarations. A user service
//! dispatches registration and payment events synchronously and asynchronously.

use std::sync::Arc;

use eventsys_core::{
    DispatchEngine, Event, EventDispatcher, EventType, FilterDeclaration, InMemoryListenerRegistry,
    InlineWorkerPool, Invocation, ListenError, ListenerDeclaration, MethodListener, Origin,
    OwnerId, ParameterSpec, Priority, PropertyEvent, ValueType,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

struct EventTypes {
    user: EventType,
    register: EventType,
    payment: EventType,
}

impl EventTypes {
    fn new() -> Self {
        let user = EventType::new("UserEvent");
        let register = EventType::with_parents("UserRegisterEvent", [user.clone()]);
        Self {
            user,
            register,
            payment: EventType::new("PaymentEvent"),
        }
    }
}

/// Rejects registrations from blocked domains by cancelling the event
struct ModerationPlugin {
    blocked_domain: String,
}

impl ModerationPlugin {
    fn on_register(&self, invocation: &Invocation<'_>) -> anyhow::Result<Value> {
        let email = invocation
            .value("email")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let blocked = email.ends_with(&self.blocked_domain);
        if let Some(cancellable) = invocation.event.as_cancellable() {
            cancellable.set_cancelled(blocked);
        }
        Ok(json!({ "blocked": blocked }))
    }
}

/// Records what it sees
#[derive(Default)]
struct AuditPlugin {
    seen: Mutex<Vec<String>>,
}

impl AuditPlugin {
    fn on_user(&self, invocation: &Invocation<'_>) -> anyhow::Result<Value> {
        self.seen
            .lock()
            .push(format!("user:{}", invocation.event.event_type()));
        Ok(Value::Null)
    }

    fn on_welcome(&self, invocation: &Invocation<'_>) -> anyhow::Result<Value> {
        let email = invocation.value("email").cloned().unwrap_or(Value::Null);
        self.seen.lock().push(format!("welcome:{}", email));
        Ok(email)
    }

    fn on_payment(&self, invocation: &Invocation<'_>) -> anyhow::Result<Value> {
        let amount = invocation
            .value("amount")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("amount is not an integer"))?;
        let currency = invocation.value("currency").cloned().unwrap_or(json!("EUR"));
        self.seen.lock().push(format!("payment:{}", amount));
        Ok(json!({ "amount": amount, "currency": currency }))
    }
}

fn listener_declaration(name: &str, priority: Priority, parameters: Vec<ParameterSpec>) -> ListenerDeclaration {
    let mut declaration = ListenerDeclaration::new(name);
    declaration.attributes.priority = priority;
    declaration.parameters = parameters;
    declaration
}

fn setup(types: &EventTypes) -> (DispatchEngine, Arc<AuditPlugin>) {
    let engine = DispatchEngine::new(
        Arc::new(InMemoryListenerRegistry::new()),
        Arc::new(InlineWorkerPool),
    );

    let moderation = Arc::new(ModerationPlugin {
        blocked_domain: "@spam.test".to_string(),
    });
    let mut moderate = listener_declaration(
        "on_register",
        Priority::First,
        vec![
            ParameterSpec::event("event", types.register.clone()),
            ParameterSpec::value("email", ValueType::String),
        ],
    );
    moderate.cancel_affected = true;
    let listener = MethodListener::from_declaration(moderation, &moderate, ModerationPlugin::on_register).unwrap();
    engine.register("moderation", Arc::new(listener)).unwrap();

    let audit = Arc::new(AuditPlugin::default());

    let on_user = listener_declaration(
        "on_user",
        Priority::Last,
        vec![ParameterSpec::event("event", types.user.clone())],
    );
    let listener = MethodListener::from_declaration(audit.clone(), &on_user, AuditPlugin::on_user).unwrap();
    engine.register("audit", Arc::new(listener)).unwrap();

    let mut on_welcome = listener_declaration(
        "on_welcome",
        Priority::Normal,
        vec![ParameterSpec::value("email", ValueType::String)],
    );
    on_welcome.attributes.ignore_cancelled = true;
    on_welcome.filter = Some(FilterDeclaration {
        event_types: vec![types.register.clone()],
        use_event_arg: false,
    });
    let listener = MethodListener::from_declaration(audit.clone(), &on_welcome, AuditPlugin::on_welcome).unwrap();
    engine.register("audit", Arc::new(listener)).unwrap();

    let mut on_payment = listener_declaration(
        "on_payment",
        Priority::Normal,
        vec![
            ParameterSpec::property("amount", ValueType::Integer),
            ParameterSpec::value("currency", ValueType::String).wrapped(),
        ],
    );
    on_payment.filter = Some(FilterDeclaration {
        event_types: vec![types.payment.clone()],
        use_event_arg: false,
    });
    on_payment.attributes.channel = "billing".to_string();
    let listener = MethodListener::from_declaration(audit.clone(), &on_payment, AuditPlugin::on_payment).unwrap();
    engine.register("audit", Arc::new(listener)).unwrap();

    (engine, audit)
}

fn register_event(types: &EventTypes, email: &str) -> Arc<PropertyEvent> {
    Arc::new(
        PropertyEvent::builder(types.register.clone())
            .property("email", json!(email))
            .cancellable(false)
            .build()
            .unwrap(),
    )
}

#[test]
fn test_accepted_registration_reaches_every_listener() {
    let types = EventTypes::new();
    let (engine, audit) = setup(&types);

    let results = engine.dispatch(register_event(&types, "ada@example.com"), &Origin::new("user-service"));

    let names: Vec<&str> = results.iter().map(|r| r.listener.name()).collect();
    assert_eq!(names, vec!["on_register", "on_welcome", "on_user"]);
    assert!(results.iter().all(|r| r.result.is_success()));
    assert_eq!(
        *audit.seen.lock(),
        vec!["welcome:\"ada@example.com\"", "user:UserRegisterEvent"]
    );
}

#[test]
fn test_cancelled_registration_skips_ignoring_listeners() {
    let types = EventTypes::new();
    let (engine, audit) = setup(&types);

    let results = engine.dispatch(register_event(&types, "bot@spam.test"), &Origin::new("user-service"));

    assert_eq!(results[0].result.as_value(), Some(&json!({ "blocked": true })));
    assert!(matches!(results[1].result.error(), Some(ListenError::EventCancelled)));
    assert!(results[2].result.is_success());
    assert!(results[2].event.is_cancelled());
    assert_eq!(*audit.seen.lock(), vec!["user:UserRegisterEvent"]);
}

#[test]
fn test_payment_channel_and_optional_currency() {
    let types = EventTypes::new();
    let (engine, audit) = setup(&types);
    let origin = Origin::new("billing-service");

    let payment = Arc::new(
        PropertyEvent::builder(types.payment.clone())
            .property("amount", json!(42))
            .build()
            .unwrap(),
    );

    assert!(engine.dispatch_in(payment.clone(), &origin, "shipping").is_empty());

    let results = engine.dispatch_in(payment, &origin, "billing");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].channel, "billing");
    assert_eq!(
        results[0].result.as_value(),
        Some(&json!({ "amount": 42, "currency": "EUR" }))
    );

    let missing_amount = Arc::new(PropertyEvent::builder(types.payment.clone()).build().unwrap());
    let results = engine.dispatch_in(missing_amount, &origin, "billing");
    match results[0].result.error() {
        Some(ListenError::PropertyNotFound { name, value_type }) => {
            assert_eq!(name, "amount");
            assert_eq!(*value_type, ValueType::Integer);
        }
        other => panic!("expected PropertyNotFound, got {:?}", other),
    }
    assert_eq!(*audit.seen.lock(), vec!["payment:42"]);
}

#[tokio::test]
async fn test_async_dispatch_and_owner_teardown() {
    let types = EventTypes::new();
    let (engine, _audit) = setup(&types);
    let origin = Origin::new("user-service");

    let results = engine
        .dispatch_async(register_event(&types, "grace@example.com"), &origin)
        .await_all()
        .await;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.origin == origin));

    assert_eq!(engine.unregister(OwnerId::from("audit")), 3);
    let results = engine.dispatch(register_event(&types, "grace@example.com"), &origin);
    let names: Vec<&str> = results.iter().map(|r| r.listener.name()).collect();
    assert_eq!(names, vec!["on_register"]);
}
