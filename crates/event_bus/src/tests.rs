// Dispatch scenarios across the whole bus.

use crate::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Signal {
    state: EventState,
    payload: u32,
}
crate::impl_event!(Signal);

#[derive(Debug, Default)]
struct Veto {
    state: EventState,
}
crate::impl_event!(Veto, cancelable, has_result);

fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn Fn(&mut Signal) -> ListenerResult + Send + Sync>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let shared = log.clone();
    let make = move |label: &'static str| -> Box<dyn Fn(&mut Signal) -> ListenerResult + Send + Sync> {
        let log = shared.clone();
        Box::new(move |_: &mut Signal| {
            log.lock().push(label);
            Ok(())
        })
    };
    (log, make)
}

#[test]
fn test_post_runs_phases_from_highest_to_lowest() {
    let bus = EventBus::new();
    let (log, make) = recorder();
    bus.add_listener::<Signal, _>(EventPriority::Normal, false, make("normal"));
    bus.add_listener::<Signal, _>(EventPriority::Lowest, false, make("lowest"));
    bus.add_listener::<Signal, _>(EventPriority::Highest, false, make("highest"));

    bus.post(Signal::default()).unwrap();
    assert_eq!(*log.lock(), vec!["highest", "normal", "lowest"]);
}

#[test]
fn test_registration_order_within_a_phase() {
    let bus = EventBus::new();
    let (log, make) = recorder();
    bus.add_listener::<Signal, _>(EventPriority::High, false, make("first"));
    bus.add_listener::<Signal, _>(EventPriority::High, false, make("second"));
    bus.add_listener::<Signal, _>(EventPriority::High, false, make("third"));

    let event = bus.post(Signal::default()).unwrap();
    assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    assert_eq!(event.current_phase(), Some(EventPriority::High));
}

#[test]
fn test_post_to_phase_only_reaches_that_phase() {
    let bus = EventBus::new();
    let (log, make) = recorder();
    bus.add_listener::<Signal, _>(EventPriority::Highest, false, make("highest"));
    bus.add_listener::<Signal, _>(EventPriority::Low, false, make("low"));

    bus.post_to_phase(EventPriority::Low, Signal::default()).unwrap();
    assert_eq!(*log.lock(), vec!["low"]);
}

#[test]
fn test_canceled_event_skips_filtered_listeners() {
    let bus = EventBus::new();
    let filtered = Arc::new(AtomicUsize::new(0));
    let unfiltered = Arc::new(AtomicUsize::new(0));
    {
        let filtered = filtered.clone();
        bus.add_listener(EventPriority::Normal, false, move |_: &mut Veto| {
            filtered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    {
        let unfiltered = unfiltered.clone();
        bus.add_listener(EventPriority::Normal, true, move |_: &mut Veto| {
            unfiltered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    let mut event = Veto::default();
    event.set_canceled(true).unwrap();
    let event = bus.post(event).unwrap();

    assert!(event.is_canceled());
    assert_eq!(filtered.load(Ordering::SeqCst), 0);
    assert_eq!(unfiltered.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancel_in_earlier_phase_filters_later_phases() {
    let bus = EventBus::new();
    let later = Arc::new(AtomicUsize::new(0));
    bus.add_listener(EventPriority::Highest, false, |veto: &mut Veto| {
        veto.set_canceled(true)?;
        veto.set_result(EventResult::Deny)?;
        Ok(())
    });
    {
        let later = later.clone();
        bus.listen(move |_: &mut Veto| {
            later.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    let event = bus.post(Veto::default()).unwrap();
    assert_eq!(event.result(), EventResult::Deny);
    assert_eq!(later.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stopped_bus_returns_event_untouched() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = calls.clone();
        bus.listen(move |signal: &mut Signal| {
            signal.payload += 1;
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    bus.shutdown();
    bus.shutdown();
    let event = bus.post(Signal { payload: 7, ..Default::default() }).unwrap();
    assert_eq!(event.payload, 7);
    assert_eq!(event.current_phase(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    bus.start();
    let event = bus.post(Signal { payload: 7, ..Default::default() }).unwrap();
    assert_eq!(event.payload, 8);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = bus.stats();
    assert_eq!(stats.events_ignored, 1);
    assert_eq!(stats.events_posted, 1);
}

#[test]
fn test_bus_configured_stopped_ignores_posts() {
    let bus = EventBus::with_config(BusConfig {
        start_running: false,
        ..BusConfig::default()
    });
    assert!(!bus.is_running());
    bus.listen(|_: &mut Signal| Err("must not run".into()));
    assert!(bus.post(Signal::default()).is_ok());
}

#[test]
fn test_failing_listener_does_not_stop_dispatch() {
    let bus = EventBus::new();
    let reports: Arc<Mutex<Vec<(ListenerId, EventPriority, bool, u32)>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let reports = reports.clone();
        bus.set_exception_handler(Arc::new(move |event: &dyn DynEvent, error: &ListenerInvocationError| {
            let payload = event.downcast_ref::<Signal>().map_or(0, |signal| signal.payload);
            reports
                .lock()
                .push((error.listener.id, error.phase, error.is_panic(), payload));
        }));
    }

    let (log, make) = recorder();
    let failing = bus.add_listener(EventPriority::Normal, false, |_: &mut Signal| Err("boom".into()));
    let panicking = bus.add_listener(EventPriority::Normal, false, |_: &mut Signal| -> ListenerResult {
        panic!("listener exploded")
    });
    bus.add_listener::<Signal, _>(EventPriority::Normal, false, make("same phase"));
    bus.add_listener::<Signal, _>(EventPriority::Lowest, false, make("later phase"));

    bus.post(Signal { payload: 42, ..Default::default() }).unwrap();

    assert_eq!(*log.lock(), vec!["same phase", "later phase"]);
    assert_eq!(
        *reports.lock(),
        vec![
            (failing, EventPriority::Normal, false, 42),
            (panicking, EventPriority::Normal, true, 42),
        ]
    );
    assert_eq!(bus.stats().listener_failures, 2);
}

#[test]
fn test_reposting_same_event_violates_phase_order() {
    let bus = EventBus::new();
    bus.listen(|_: &mut Signal| Ok(()));

    let event = bus.post(Signal::default()).unwrap();
    let err = bus.post(event).unwrap_err();
    assert!(matches!(
        err,
        EventError::PhaseOrderViolation {
            current: EventPriority::Normal,
            requested: EventPriority::Normal,
            ..
        }
    ));
}

#[test]
fn test_listener_may_register_listener_during_dispatch() {
    let bus = Arc::new(EventBus::new());
    let late_calls = Arc::new(AtomicUsize::new(0));
    {
        let weak = Arc::downgrade(&bus);
        let late_calls = late_calls.clone();
        let armed = AtomicUsize::new(0);
        bus.add_listener(EventPriority::Normal, false, move |_: &mut Signal| {
            if armed.fetch_add(1, Ordering::SeqCst) == 0 {
                if let Some(bus) = weak.upgrade() {
                    let late_calls = late_calls.clone();
                    bus.add_listener(EventPriority::Normal, false, move |_: &mut Signal| {
                        late_calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    });
                }
            }
            Ok(())
        });
    }

    bus.post(Signal::default()).unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);
    assert_eq!(bus.listener_count::<Signal>(), 2);

    bus.post(Signal::default()).unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_listener_added_for_later_phase_runs_in_same_post() {
    let bus = Arc::new(EventBus::new());
    let late_calls = Arc::new(AtomicUsize::new(0));
    {
        let weak = Arc::downgrade(&bus);
        let late_calls = late_calls.clone();
        let armed = AtomicUsize::new(0);
        bus.add_listener(EventPriority::Highest, false, move |_: &mut Signal| {
            if armed.fetch_add(1, Ordering::SeqCst) == 0 {
                if let Some(bus) = weak.upgrade() {
                    let late_calls = late_calls.clone();
                    bus.add_listener(EventPriority::Lowest, false, move |_: &mut Signal| {
                        late_calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    });
                }
            }
            Ok(())
        });
    }

    let event = bus.post(Signal::default()).unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    assert_eq!(event.current_phase(), Some(EventPriority::Lowest));

    bus.post(Signal::default()).unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 2);
}

struct Counter {
    hits: AtomicUsize,
}

impl Subscriber for Counter {
    fn subscribe(self: Arc<Self>, subscriptions: &mut SubscriptionList) {
        let me = self.clone();
        subscriptions.on("count_signal", EventPriority::High, false, move |_: &mut Signal| {
            me.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let me = self;
        subscriptions.on("count_veto", EventPriority::Low, true, move |_: &mut Veto| {
            me.hits.fetch_add(10, Ordering::SeqCst);
            Ok(())
        });
    }
}

#[test]
fn test_subscriber_registration_is_idempotent() {
    let bus = EventBus::new();
    let counter = Arc::new(Counter {
        hits: AtomicUsize::new(0),
    });

    assert_eq!(bus.register(&counter), 2);
    assert_eq!(bus.register(&counter), 0);
    assert!(bus.is_registered(TargetId::of_instance(&counter)));

    bus.post(Signal::default()).unwrap();
    let mut veto = Veto::default();
    veto.set_canceled(true).unwrap();
    bus.post(veto).unwrap();
    assert_eq!(counter.hits.load(Ordering::SeqCst), 11);

    assert_eq!(bus.unregister(&counter), 2);
    bus.post(Signal::default()).unwrap();
    assert_eq!(counter.hits.load(Ordering::SeqCst), 11);
    assert_eq!(Arc::strong_count(&counter), 1);
}

#[test]
fn test_unregistering_unknown_target_is_noop() {
    let bus = EventBus::new();
    let stranger = Arc::new(Counter {
        hits: AtomicUsize::new(0),
    });
    assert_eq!(bus.unregister(&stranger), 0);
    assert!(!bus.remove_listener(ListenerId(999)));
}

static STATIC_HITS: AtomicUsize = AtomicUsize::new(0);

struct Audit;

impl StaticSubscriber for Audit {
    fn subscribe(subscriptions: &mut SubscriptionList) {
        subscriptions.on("audit", EventPriority::Lowest, true, |_: &mut Veto| {
            STATIC_HITS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
}

#[test]
fn test_static_subscriber_lifecycle() {
    let bus = EventBus::new();
    assert_eq!(bus.register_static::<Audit>(), 1);
    assert_eq!(bus.register_static::<Audit>(), 0);

    bus.post(Veto::default()).unwrap();
    assert_eq!(bus.unregister_static::<Audit>(), 1);
    bus.post(Veto::default()).unwrap();
    assert_eq!(STATIC_HITS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_remove_listener_by_id() {
    let bus = EventBus::new();
    let (log, make) = recorder();
    let id = bus.add_listener::<Signal, _>(EventPriority::Normal, false, make("removed"));
    bus.add_listener::<Signal, _>(EventPriority::Normal, false, make("kept"));

    assert!(bus.remove_listener(id));
    bus.post(Signal::default()).unwrap();
    assert_eq!(*log.lock(), vec!["kept"]);
}

#[test]
fn test_listeners_of_lists_dispatch_order() {
    let bus = EventBus::new();
    let ids = crate::listen_all!(bus;
        Lowest: Signal => |_: &mut Signal| Ok(()),
        Highest: Signal => |_: &mut Signal| Ok(()),
    );
    let order: Vec<ListenerId> = bus.listeners_of::<Signal>().iter().map(|info| info.id).collect();
    assert_eq!(order, vec![ids[1], ids[0]]);
}

#[test]
fn test_set_canceled_on_plain_event_fails() {
    let mut signal = Signal::default();
    assert_eq!(
        signal.set_canceled(true),
        Err(EventError::NotCancelable(std::any::type_name::<Signal>()))
    );
}

#[test]
fn test_bus_config_defaults() {
    let config: BusConfig = serde_json::from_str(r#"{"name": "aux"}"#).unwrap();
    assert_eq!(config.name, "aux");
    assert!(config.start_running);
    assert!(config.catch_panics);
}
