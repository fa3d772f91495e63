use courier::transport::MemoryTransport;
use courier::{Email, FailoverPolicy, MailError, Mailer};

fn email() -> Email {
    Email::builder()
        .to("user@example.com")
        .subject("Hello")
        .text("Body")
        .build()
        .unwrap()
}

#[tokio::test]
async fn send_uses_default_transport() {
    let transport = MemoryTransport::named("primary").message_id("p-1");
    let mailer = Mailer::builder()
        .transport(transport.clone())
        .build()
        .unwrap();

    let delivery = mailer.send(&email()).await.unwrap();

    assert_eq!(delivery.message_id.as_deref(), Some("p-1"));
    assert_eq!(transport.sent()[0].to, vec!["user@example.com"]);
}

#[tokio::test]
async fn send_falls_back_along_configured_chain() {
    let primary = MemoryTransport::named("primary").fail_with("down");
    let backup = MemoryTransport::named("backup").message_id("b-1");

    let mailer = Mailer::builder()
        .transport(primary.clone())
        .transport(backup.clone())
        .policy(FailoverPolicy::new().chain(["backup"]))
        .build()
        .unwrap();

    let report = mailer.send_report(&email()).await;

    assert!(report.success);
    assert_eq!(report.provider, "backup");
    assert!(report.failover_used);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(backup.sent_count(), 1);
}

#[tokio::test]
async fn send_surfaces_total_exhaustion_as_error() {
    let primary = MemoryTransport::named("primary").fail_with("down");
    let backup = MemoryTransport::named("backup").fail_with("also down");

    let mailer = Mailer::builder()
        .transport(primary)
        .transport(backup)
        .policy(FailoverPolicy::new().chain(["backup"]))
        .build()
        .unwrap();

    let result = mailer.send(&email()).await;

    assert!(matches!(
        result,
        Err(MailError::Delivery(message)) if message == "All providers failed"
    ));
}

#[cfg(feature = "templates")]
#[tokio::test]
async fn send_template_renders_and_delivers() {
    use std::collections::HashMap;

    use courier::template::Context;
    use courier::{EmailBody, TemplateEngine};

    let mut templates = HashMap::new();
    templates.insert(
        "welcome.html".to_string(),
        "<p>Hi {{ name }}</p>".to_string(),
    );
    templates.insert("welcome.txt".to_string(), "Hi {{ name }}".to_string());
    let engine = TemplateEngine::from_strings(templates).unwrap();

    let transport = MemoryTransport::new();
    let mailer = Mailer::builder()
        .transport(transport.clone())
        .templates(engine)
        .build()
        .unwrap();

    let mut context = Context::new();
    context.insert("name", "Ada");

    mailer
        .send_template("welcome", "user@example.com", "Welcome!", &context)
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Welcome!");
    assert!(matches!(
        &sent[0].body,
        EmailBody::Multipart { text, html }
            if text == "Hi Ada" && html == "<p>Hi Ada</p>"
    ));
}
