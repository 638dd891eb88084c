use sequencer_rs::{Invocation, Sequencer, SequencerState, Step, StepEventKind, StepOutcome};
use serde_json::json;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fetch_then_process_across_worker_threads() {
        crate::init_tracing();

        let seq = Sequencer::new();
        let finished = seq.completion();
        let processed = Arc::new(Mutex::new(Vec::new()));

        seq.then_with(
            |ctx| {
                let page = ctx.input().clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    ctx.done(json!({ "page": page, "rows": 10 }));
                });
                StepOutcome::Continue
            },
            vec![json!(1), json!(2), json!(3)],
            Invocation::Call,
        );

        let sink = Arc::clone(&processed);
        seq.queue(move |previous| {
            sink.lock().unwrap().push(previous["page"].clone());
            StepOutcome::Continue
        });

        let receipt = finished.await.unwrap();
        assert_eq!(receipt.result, json!({ "page": 3, "rows": 10 }));
        assert_eq!(*processed.lock().unwrap(), vec![json!(3)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn workers_joined_with_when() {
        crate::init_tracing();

        let main = Sequencer::new();
        let workers: Vec<Sequencer> = (0..3).map(|_| main.fork()).collect();

        for (i, worker) in workers.iter().enumerate() {
            worker.then(move |ctx| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(5 * (3 - i as u64))).await;
                    ctx.done(i);
                });
                StepOutcome::Continue
            });
        }

        let finished = main.completion();
        main.when(&workers).queue(|previous| {
            assert_eq!(*previous, json!([0, 1, 2]));
            StepOutcome::Continue
        });

        let receipt = finished.await.unwrap();
        assert_eq!(receipt.result, json!([0, 1, 2]));
    }

    #[tokio::test]
    async fn polling_loop_paused_and_resumed() {
        let seq = Sequencer::new();
        let polls = Arc::new(Mutex::new(0u32));

        let counter = Arc::clone(&polls);
        seq.delay(Duration::from_millis(1), true)
            .repeat(None)
            .then_step(Step::named("poll", move |ctx| {
                *counter.lock().unwrap() += 1;
                let ctx2 = ctx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    ctx2.done(());
                });
                StepOutcome::Continue
            }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        seq.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let paused_at = *polls.lock().unwrap();
        assert!(paused_at > 1);
        assert!(seq.state().contains(SequencerState::PAUSED | SequencerState::LOOPING));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*polls.lock().unwrap(), paused_at);

        seq.restart();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(*polls.lock().unwrap() > paused_at);

        seq.erase();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(seq.state().is_idle());
    }

    #[test]
    fn delay_without_a_runtime_still_completes() {
        let seq = Sequencer::new();
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);

        seq.on_complete_once(move |seq, _| {
            let _ = tx.lock().unwrap().send(seq.last_result());
        });
        seq.then(|ctx| {
            ctx.done("waited");
            StepOutcome::Once
        });
        // The first chain drained synchronously and consumed the observer.
        assert_eq!(rx.try_recv().unwrap(), json!("waited"));

        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        seq.on_complete_once(move |seq, _| {
            let _ = tx.lock().unwrap().send(seq.last_result());
        });
        seq.delay(Duration::from_millis(5), false);

        let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(result, json!("waited"));
    }

    #[test]
    fn events_describe_a_failed_chain() {
        let seq = Sequencer::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&events);
        seq.add_listener(move |event| {
            sink.lock()
                .unwrap()
                .push((event.step_name.as_deref().map(str::to_owned), event.kind.clone()));
        });

        seq.then_step(Step::named("validate", |ctx| {
            ctx.fail(json!({ "reason": "bad input" }));
            StepOutcome::Continue
        }));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].0.as_deref(), Some("validate"));
        assert!(matches!(events[0].1, StepEventKind::Invoked { .. }));
        assert_eq!(
            events[1],
            (
                Some("validate".to_string()),
                StepEventKind::Failed {
                    data: json!({ "reason": "bad input" })
                }
            )
        );
        assert!(matches!(events[2].1, StepEventKind::Drained { .. }));
    }
}
