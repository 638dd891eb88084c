use sequencer_rs::config::{DEFAULT_JOURNAL_CAPACITY, MAX_JOURNAL_CAPACITY};
use sequencer_rs::{Sequencer, SequencerConfig, SequencerError, StepOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SequencerConfig::default();
        assert_eq!(config.name, "sequencer");
        assert_eq!(config.journal_capacity, DEFAULT_JOURNAL_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn named_trims_the_name() {
        let config = SequencerConfig::named("  order   intake ");
        assert_eq!(config.name, "order intake");
    }

    #[test]
    fn from_json_fills_missing_keys() {
        let config = SequencerConfig::from_json(r#"{ "journal_capacity": 8 }"#).unwrap();
        assert_eq!(config.name, "sequencer");
        assert_eq!(config.journal_capacity, 8);
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let config = SequencerConfig::from_json_layers(&[
            r#"{ "name": "base", "journal_capacity": 16 }"#,
            r#"{ "name": "  override " }"#,
        ])
        .unwrap();
        assert_eq!(config.name, "override");
        assert_eq!(config.journal_capacity, 16);
    }

    #[test]
    fn non_object_layer_is_rejected() {
        let err = SequencerConfig::from_json_layers(&["{}", "[1, 2]"]).unwrap_err();
        match err {
            SequencerError::InvalidConfig(message) => {
                assert!(message.contains("layer 1"));
                assert!(message.contains("array"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = SequencerConfig::from_json("{ name: ").unwrap_err();
        assert!(matches!(err, SequencerError::InvalidConfig(_)));
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        let err = SequencerConfig::from_json(r#"{ "journal_capacity": "many" }"#).unwrap_err();
        assert!(matches!(err, SequencerError::InvalidConfig(_)));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        assert!(SequencerConfig::from_json(r#"{ "name": "   " }"#).is_err());

        let config = SequencerConfig {
            journal_capacity: MAX_JOURNAL_CAPACITY + 1,
            ..SequencerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn sequencer_reports_its_config() {
        crate::init_tracing();

        let seq = Sequencer::with_config(SequencerConfig::named("ingest"));
        assert_eq!(seq.name(), "ingest");
        assert_eq!(seq.config().journal_capacity, DEFAULT_JOURNAL_CAPACITY);

        seq.then(|ctx| {
            ctx.done("logged");
            StepOutcome::Continue
        });
        assert_eq!(seq.last_result(), "logged");

        let debug = format!("{seq:?}");
        assert!(debug.contains("ingest"));
    }
}
