use sequencer_rs::sequencer::SharedSettings;
use sequencer_rs::{Sequencer, StepOutcome, Value};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[cfg(test)]
mod tests {
    use super::*;

    fn run_one(seq: &Sequencer) {
        seq.then(|ctx| {
            ctx.done(());
            StepOutcome::Continue
        });
    }

    #[test]
    fn fork_reads_parent_settings_at_lookup_time() {
        let parent = Sequencer::new();
        parent.set("region", "eu");
        let fork = parent.fork();

        assert_eq!(fork.get("region"), Some(json!("eu")));

        parent.set("retries", 3);
        assert_eq!(fork.get("retries"), Some(json!(3)));
        assert_eq!(fork.get("missing"), None);
    }

    #[test]
    fn fork_set_shadows_without_touching_parent() {
        let parent = Sequencer::new();
        parent.set("region", "eu");
        let fork = parent.fork();

        fork.set("region", "us");
        assert_eq!(fork.get("region"), Some(json!("us")));
        assert_eq!(parent.get("region"), Some(json!("eu")));

        fork.set("region", Value::Null);
        assert_eq!(fork.get("region"), Some(json!("eu")));
    }

    #[test]
    fn setter_writes_through_to_parent() {
        let parent = Sequencer::new();
        let fork = parent.fork();

        fork.setter("shared", "value");
        assert_eq!(parent.get("shared"), Some(json!("value")));
        assert_eq!(fork.get("shared"), Some(json!("value")));

        fork.setter("shared", Value::Null);
        assert_eq!(parent.get("shared"), None);
    }

    #[test]
    fn setter_on_root_writes_locally() {
        let root = Sequencer::new();
        root.setter("k", true);
        assert_eq!(root.get("k"), Some(json!(true)));
    }

    #[test]
    fn setter_on_a_nested_fork_writes_to_the_root() {
        let root = Sequencer::new();
        let child = root.fork();
        let grandchild = child.fork();

        grandchild.setter("depth", 1);
        assert_eq!(root.get("depth"), Some(json!(1)));
        assert_eq!(child.get("depth"), Some(json!(1)));
        assert_eq!(grandchild.get("depth"), Some(json!(1)));

        child.set("depth", 2);
        assert_eq!(grandchild.get("depth"), Some(json!(2)));
        assert_eq!(root.get("depth"), Some(json!(1)));

        grandchild.setter("depth", Value::Null);
        assert_eq!(root.get("depth"), None);
        assert_eq!(grandchild.get("depth"), Some(json!(2)));
    }

    #[test]
    fn fork_copies_observers_by_value() {
        let parent = Sequencer::new();
        let fired_on = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&fired_on);
        parent.on_complete(move |seq, _| sink.lock().unwrap().push(seq.id()));

        let fork = parent.fork();
        parent.on_complete(|_, _| {});
        assert_eq!(parent.complete_observers(), 2);
        assert_eq!(fork.complete_observers(), 1);

        run_one(&fork);
        assert_eq!(*fired_on.lock().unwrap(), vec![fork.id()]);
    }

    #[test]
    fn fork_with_can_skip_observers_and_listeners() {
        let parent = Sequencer::new();
        let events = Arc::new(Mutex::new(0));

        let sink = Arc::clone(&events);
        parent
            .on_complete(|_, _| {})
            .on_failure(|_, _| {})
            .add_listener(move |_| *sink.lock().unwrap() += 1);

        let bare = parent.fork_with(false, false);
        assert_eq!(bare.complete_observers(), 0);
        assert_eq!(bare.failure_observers(), 0);
        run_one(&bare);
        assert_eq!(*events.lock().unwrap(), 0);

        let observed = parent.fork_with(true, false);
        assert_eq!(observed.complete_observers(), 1);
        assert_eq!(observed.failure_observers(), 1);
    }

    #[test]
    fn copied_listeners_see_the_fork_identity() {
        let parent = Sequencer::new();
        let ids = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&ids);
        parent.add_listener(move |event| sink.lock().unwrap().push(event.sequencer_id));

        let fork = parent.fork();
        run_one(&fork);

        let ids = ids.lock().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| *id == fork.id()));
    }

    #[test]
    fn clone_is_the_same_instance() {
        let seq = Sequencer::new();
        let handle = seq.clone();
        assert!(handle.same_instance(&seq));

        handle.set("k", 1);
        assert_eq!(seq.get("k"), Some(json!(1)));
    }

    #[test]
    fn settings_layers_fall_back_to_parent() {
        let root = SharedSettings::root();
        let child = SharedSettings::child_of(&root);

        root.put("a", json!(1));
        child.put("b", json!(2));

        assert_eq!(child.get("a"), Some(json!(1)));
        assert!(!child.has_own("a"));
        assert!(child.has_own("b"));
        assert_eq!(root.get("b"), None);
        assert_eq!(child.len(), 1);

        child.put("b", Value::Null);
        assert!(child.is_empty());
    }
}
