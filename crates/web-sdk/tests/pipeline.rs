//! End-to-end behaviour of the tracking pipeline on an in-memory page.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use serde_json::json;

use trackwire_core::collector::capture_collector;
use trackwire_core::{EffectiveConfig, GateState, Properties};
use trackwire_web_sdk::page::{Page, Viewport};
use trackwire_web_sdk::{Registry, Tracker};

fn page(location: &str) -> Arc<Page> {
    Arc::new(Page::new(location).expect("valid location"))
}

fn config(overrides: serde_json::Value) -> EffectiveConfig {
    EffectiveConfig::resolve(&overrides).expect("valid config")
}

fn props(value: serde_json::Value) -> Properties {
    value.as_object().cloned().expect("object")
}

#[tokio::test(start_paused = true)]
async fn queued_event_delivered_once_on_second_poll() {
    let page = page("https://example.com/");
    let tracker = Tracker::start(
        page.clone(),
        config(json!({"retry_attempts": 5, "retry_delay_sec": 1.0})),
    );

    tracker.log_event("Form Submit!!", props(json!({"form_id": "x"})));
    assert_eq!(tracker.pending(), 1);

    // first poll at 1s sees nothing
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(tracker.state(), GateState::NotReady);

    let collector = capture_collector();
    page.install_collector(collector.clone());

    // second poll at 2s
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(tracker.state(), GateState::Ready);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let calls = collector.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].event_name, "form_submit");
    assert_eq!(calls[0].properties["form_id"], "x");
    assert_eq!(calls[0].properties.len(), 2);
    let ts = calls[0].properties["timestamp"].as_str().expect("timestamp string");
    assert!(DateTime::parse_from_rfc3339(ts).is_ok());
}

#[tokio::test(start_paused = true)]
async fn queued_events_drain_in_fifo_order() {
    let page = page("https://example.com/");
    let tracker = Tracker::start(page.clone(), config(json!({"retry_delay_sec": 0.1})));

    for name in ["one", "two", "three", "four"] {
        tracker.log_event(name, Properties::new());
    }
    let collector = capture_collector();
    page.install_collector(collector.clone());
    tokio::time::sleep(Duration::from_millis(150)).await;

    tracker.log_event("five", Properties::new());
    assert_eq!(collector.names(), vec!["one", "two", "three", "four", "five"]);
}

#[tokio::test(start_paused = true)]
async fn collector_never_ready_means_no_delivery() {
    let page = page("https://example.com/");
    let tracker = Tracker::start(
        page.clone(),
        config(json!({"retry_attempts": 3, "retry_delay_sec": 0.2})),
    );
    tracker.log_event("lead", Properties::new());

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(tracker.state(), GateState::Failed);
    assert!(tracker.installed_adaptors().is_empty());

    // arriving late changes nothing
    let collector = capture_collector();
    page.install_collector(collector.clone());
    tracker.log_event("after", Properties::new());
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(collector.count(), 0);
    assert_eq!(tracker.state(), GateState::Failed);
}

#[tokio::test(start_paused = true)]
async fn scroll_straight_to_80_percent_fires_three_thresholds() {
    let page = page("https://example.com/article");
    page.set_viewport(Viewport {
        scroll_y: 0.0,
        scroll_height: 3000.0,
        inner_height: 1000.0,
    });
    let collector = capture_collector();
    page.install_collector(collector.clone());

    let _tracker = Tracker::start(
        page.clone(),
        config(json!({
            "tracking": {"scroll_depth": {"enabled": true, "thresholds": [25, 50, 75]}}
        })),
    );

    page.scroll_to(1600.0);
    page.scroll_to(1650.0);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let calls = collector.calls();
    let percentages: Vec<_> = calls
        .iter()
        .map(|c| c.properties["percentage"].as_u64().expect("percentage"))
        .collect();
    assert_eq!(percentages, vec![25, 50, 75]);
    assert!(calls.iter().all(|c| c.event_name == "scroll_depth"));
    assert_eq!(calls[0].properties["url"], "https://example.com/article");
}

#[tokio::test(start_paused = true)]
async fn deferred_scroll_check_respects_landing_position() {
    let landed_deep = page("https://example.com/article#pricing");
    landed_deep.set_viewport(Viewport {
        scroll_y: 1200.0,
        scroll_height: 3000.0,
        inner_height: 1000.0,
    });
    let deep_collector = capture_collector();
    landed_deep.install_collector(deep_collector.clone());

    let _deep = Tracker::start(
        landed_deep.clone(),
        config(json!({"tracking": {"scroll_depth": {"enabled": true}}})),
    );
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(deep_collector.count(), 0);

    // heuristic off: the deferred check evaluates the landing position
    let no_skip = page("https://example.com/article#pricing");
    no_skip.set_viewport(Viewport {
        scroll_y: 1200.0,
        scroll_height: 3000.0,
        inner_height: 1000.0,
    });
    let no_skip_collector = capture_collector();
    no_skip.install_collector(no_skip_collector.clone());
    let _eager = Tracker::start(
        no_skip.clone(),
        config(json!({
            "tracking": {"scroll_depth": {"enabled": true, "skip_initial_if_scrolled": false}}
        })),
    );
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(no_skip_collector.count(), 2);

    // a real scroll still arms the first page
    landed_deep.scroll_to(1250.0);
    assert_eq!(deep_collector.count(), 2);
}

#[tokio::test]
async fn links_are_annotated_for_delegated_tracking() {
    let page = page("https://example.com/");
    let tel = page.create_element("a", None);
    page.set_attribute(tel, "href", "tel:+123");
    let internal = page.create_element("a", None);
    page.set_attribute(internal, "href", "https://example.com/pricing");
    let external = page.create_element("a", None);
    page.set_attribute(external, "href", "https://partner.org/");
    page.install_collector(capture_collector());

    let _tracker = Tracker::start(page.clone(), EffectiveConfig::default());

    assert_eq!(page.attribute(tel, "data-umami-event").as_deref(), Some("phone_click"));
    assert_eq!(page.attribute(tel, "data-umami-event-number").as_deref(), Some("+123"));
    assert_eq!(page.attribute(internal, "data-umami-event"), None);
    assert_eq!(
        page.attribute(external, "data-umami-event").as_deref(),
        Some("outbound_link_click")
    );
}

#[tokio::test]
async fn widget_messages_flow_through_one_router() {
    let page = page("https://example.com/book");
    let embed = page.create_element("div", None);
    page.set_attribute(embed, "class", "calendly-inline-widget");
    page.set_attribute(embed, "data-url", "https://calendly.com/acme/demo");
    let collector = capture_collector();
    page.install_collector(collector.clone());

    let _tracker = Tracker::start(page.clone(), EffectiveConfig::default());

    page.post_message(
        "https://calendly.com",
        json!({
            "event": "calendly.event_scheduled",
            "payload": {
                "event": {"uri": "https://api.calendly.com/scheduled_events/E1"},
                "invitee": {"uri": "https://api.calendly.com/scheduled_events/E1/invitees/I1"}
            }
        }),
    );
    // CRM container is missing: this one is dropped, the page is unaffected
    page.post_message("https://meetings.hubspot.com", json!({"meetingBookSucceeded": true}));
    // unrelated traffic
    page.post_message("https://ads.example.net", json!({"event": "calendly.event_scheduled"}));

    let calls = collector.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].event_name, "meeting_scheduled");
    assert_eq!(calls[0].properties["event_id"], "E1");
    assert_eq!(calls[0].properties["invitee_id"], "I1");
}

#[tokio::test]
async fn form_submissions_are_tracked_after_readiness() {
    let page = page("https://example.com/contact");
    let form = page.create_element("form", None);
    page.set_attribute(form, "id", "contact-form");
    page.set_attribute(form, "data-event-name", "Contact Request");
    let collector = capture_collector();
    page.install_collector(collector.clone());

    let _tracker = Tracker::start(page.clone(), EffectiveConfig::default());
    page.submit(form);

    let calls = collector.calls();
    assert_eq!(calls[0].event_name, "contact_request");
    assert_eq!(calls[0].properties["form_id"], "contact-form");
}

#[tokio::test(start_paused = true)]
async fn registry_self_initializes_after_grace_window() {
    let registry = Registry::new();
    let page = page("https://example.com/");
    let collector = capture_collector();
    page.install_collector(collector.clone());

    assert!(registry.bootstrap(page.clone(), Duration::from_millis(100)));
    registry.configure(json!({"tracking": {"forms": {"event_name": "Signup"}}}));
    let form = page.create_element("form", None);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let tracker = registry.instance().expect("instance after grace window");
    assert_eq!(tracker.state(), GateState::Ready);

    page.submit(form);
    assert_eq!(collector.names(), vec!["signup"]);

    let again = registry.initialize_once(page.clone(), None);
    assert!(Arc::ptr_eq(&tracker, &again));
}
