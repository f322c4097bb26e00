//! Command batch dispatcher
//!
//! A batch is an ordered map of command name → argument. Entries run in
//! order and independently: a bad entry records an `error` and the rest of
//! the batch still runs. Results land in one flat reply map; `message` and
//! `error` collect every entry's text joined with `"; "`.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use r503_types::SlotId;

use crate::enrollment::EnrollmentSession;
use crate::error::{Error, FaultKind, Result, UsageError};
use crate::feedback::{Feedback, FeedbackKind};
use crate::link::SensorLink;
use crate::matching;

/// Reply map returned for a batch
pub type Reply = Map<String, Value>;

pub const MESSAGE: &str = "message";
pub const ERROR: &str = "error";
pub const RESCAN_REQUIRED: &str = "rescan_required";
pub const TEMPLATES: &str = "templates";
pub const COUNT: &str = "count";

/// Commands understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    StartEnrollment(SlotId),
    Capture,
    CreateModel,
    StoreModel(SlotId),
    ResetEnrollment,
    MatchFingerprint,
    DeleteModel(SlotId),
    ListTemplates,
    CountTemplates,
    TestLed(bool),
}

impl DeviceCommand {
    /// Parse one batch entry
    pub fn parse(name: &str, value: &Value) -> Result<Self> {
        let command = match name {
            "start_enrollment" => Self::StartEnrollment(slot_arg(name, value)?),
            "capture" => Self::Capture,
            "create_model" => Self::CreateModel,
            "store_model" => Self::StoreModel(slot_arg(name, value)?),
            "reset_enrollment" => Self::ResetEnrollment,
            "match_fingerprint" => Self::MatchFingerprint,
            "delete_model" => Self::DeleteModel(slot_arg(name, value)?),
            "list_templates" => Self::ListTemplates,
            "count_templates" => Self::CountTemplates,
            // Anything but a literal `true` switches the LED off
            "test_led" => Self::TestLed(value.as_bool() == Some(true)),
            other => return Err(UsageError::UnknownCommand(other.to_string()).into()),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StartEnrollment(_) => "start_enrollment",
            Self::Capture => "capture",
            Self::CreateModel => "create_model",
            Self::StoreModel(_) => "store_model",
            Self::ResetEnrollment => "reset_enrollment",
            Self::MatchFingerprint => "match_fingerprint",
            Self::DeleteModel(_) => "delete_model",
            Self::ListTemplates => "list_templates",
            Self::CountTemplates => "count_templates",
            Self::TestLed(_) => "test_led",
        }
    }
}

fn slot_arg(command: &str, value: &Value) -> Result<SlotId> {
    let invalid = |reason: String| UsageError::InvalidArgument {
        command: command.to_string(),
        reason,
    };

    let slot = match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => SlotId::try_from(i),
            (None, Some(f)) => SlotId::try_from(f),
            (None, None) => return Err(invalid(format!("{} is not a slot", n)).into()),
        },
        Value::String(s) => s.parse(),
        other => return Err(invalid(format!("expected a slot number, got {}", other)).into()),
    };

    slot.map_err(|e| invalid(e.to_string()).into())
}

/// Run a batch against the sensor and the enrollment session.
///
/// The session is owned by the caller and lent for the duration of the
/// batch; nothing here keeps state between batches.
pub fn dispatch(
    link: &mut dyn SensorLink,
    feedback: &Feedback,
    session: &mut EnrollmentSession,
    commands: &Map<String, Value>,
) -> Reply {
    let mut reply = Reply::new();

    for (name, value) in commands {
        match DeviceCommand::parse(name, value) {
            Ok(command) => {
                debug!("Dispatching {:?}", command);
                execute(link, feedback, session, command, &mut reply);
            }
            Err(e) => {
                log_fault(name, &e);
                append(&mut reply, ERROR, e.to_string());
            }
        }
    }

    reply
}

fn execute(
    link: &mut dyn SensorLink,
    feedback: &Feedback,
    session: &mut EnrollmentSession,
    command: DeviceCommand,
    reply: &mut Reply,
) {
    let name = command.name();

    let outcome: std::result::Result<String, Failure> = match command {
        DeviceCommand::StartEnrollment(slot) => session
            .start(slot)
            .map(|()| format!("Enrollment started at slot {}. Place finger for scan 1.", slot))
            .map_err(Failure::from),

        DeviceCommand::Capture => session
            .capture_step(link, feedback)
            .map(|outcome| outcome.to_string())
            .map_err(Failure::from),

        DeviceCommand::CreateModel => match session.create_model(link, feedback) {
            Ok(()) => Ok("Model created. You can now run 'store_model' to save it.".to_string()),
            Err(e) => {
                if e.kind() == FaultKind::Protocol {
                    reply.insert(RESCAN_REQUIRED.to_string(), Value::Bool(true));
                }
                Err(e.into())
            }
        },

        DeviceCommand::StoreModel(slot) => session
            .store_model(link, feedback, slot)
            .map(|slot| format!("Model stored successfully at slot {}.", slot))
            .map_err(Failure::from),

        DeviceCommand::ResetEnrollment => {
            session.reset();
            Ok("Enrollment state reset.".to_string())
        }

        DeviceCommand::MatchFingerprint => {
            info!("Matching fingerprint...");
            let merged = matching::match_once(link, feedback)
                .and_then(|result| merge_fields(reply, result));
            match merged {
                Ok(()) => return,
                Err(e) => Err(e.into()),
            }
        }

        DeviceCommand::DeleteModel(slot) => link
            .delete_model(slot)
            .map(|()| format!("Deleted fingerprint at slot {}", slot))
            .map_err(|e| Failure::context(e, format!("Failed to delete slot {}", slot))),

        DeviceCommand::ListTemplates => match link.read_templates() {
            Ok(templates) => {
                let slots = templates
                    .into_iter()
                    .map(|slot| Value::from(slot.index()))
                    .collect();
                reply.insert(TEMPLATES.to_string(), Value::Array(slots));
                return;
            }
            Err(e) => Err(Failure::context(e, "Failed to read templates")),
        },

        DeviceCommand::CountTemplates => match link.count_templates() {
            Ok(count) => {
                reply.insert(COUNT.to_string(), Value::from(count));
                return;
            }
            Err(e) => Err(Failure::context(e, "Failed to count templates")),
        },

        DeviceCommand::TestLed(on) => {
            let (signal, message) = if on {
                (FeedbackKind::Waiting.signal(), "LED turned on (purple breathing)")
            } else {
                (FeedbackKind::Off.signal(), "LED turned off")
            };
            link.set_led(signal)
                .map(|()| message.to_string())
                .map_err(|e| Failure::context(e, "LED test failed"))
        }
    };

    match outcome {
        Ok(message) => {
            append(reply, MESSAGE, message);
        }
        Err(failure) => {
            log_fault(name, &failure.error);
            append(reply, ERROR, failure.to_string());
        }
    }
}

/// Failed command, optionally prefixed with what was being attempted
struct Failure {
    error: Error,
    context: Option<String>,
}

impl Failure {
    fn context(error: Error, what: impl Into<String>) -> Self {
        Self {
            error,
            context: Some(what.into()),
        }
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Self {
            error,
            context: None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(what) => write!(f, "{}: {}", what, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Later text under the same key is appended, never dropped
fn append(reply: &mut Reply, key: &str, text: String) {
    let merged = match reply.get(key).and_then(Value::as_str) {
        Some(existing) => format!("{}; {}", existing, text),
        None => text,
    };
    reply.insert(key.to_string(), Value::String(merged));
}

/// Merge a result's fields into the reply; it must serialize to an object
fn merge_fields(reply: &mut Reply, result: impl Serialize) -> Result<()> {
    match serde_json::to_value(result)? {
        Value::Object(fields) => {
            reply.extend(fields);
            Ok(())
        }
        other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "expected an object, got {}",
            other
        ))
        .into()),
    }
}

fn log_fault(command: &str, e: &Error) {
    match e.kind() {
        FaultKind::Usage => debug!("{}: {}", command, e),
        FaultKind::Protocol => warn!("{}: {}", command, e),
        FaultKind::Transport | FaultKind::Configuration => error!("{}: {}", command, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timing;
    use crate::link::{CharBuffer, MockSensorLink};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use r503_core::{Command, ConfirmationCode};
    use r503_types::{LedColor, LedMode, MatchResult, SearchHit};
    use serde_json::json;

    fn batch(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not a batch: {}", other),
        }
    }

    fn run(link: &mut MockSensorLink, session: &mut EnrollmentSession, commands: Value) -> Reply {
        let feedback = Feedback::new(&Timing::immediate());
        dispatch(link, &feedback, session, &batch(commands))
    }

    fn lenient_led(link: &mut MockSensorLink) {
        link.expect_set_led().returning(|_| Ok(()));
    }

    #[test]
    fn test_parse_slot_forms() {
        for value in [json!(7), json!(7.0), json!("7")] {
            assert_eq!(
                DeviceCommand::parse("start_enrollment", &value).unwrap(),
                DeviceCommand::StartEnrollment(SlotId::new(7))
            );
        }

        for value in [json!(-1), json!(1.5), json!("seven"), json!(null), json!([1])] {
            let err = DeviceCommand::parse("delete_model", &value).unwrap_err();
            assert!(matches!(err, Error::Usage(UsageError::InvalidArgument { .. })));
        }
    }

    #[test]
    fn test_parse_test_led_requires_literal_true() {
        assert_eq!(
            DeviceCommand::parse("test_led", &json!(true)).unwrap(),
            DeviceCommand::TestLed(true)
        );
        for value in [json!(false), json!(1), json!("true")] {
            assert_eq!(
                DeviceCommand::parse("test_led", &value).unwrap(),
                DeviceCommand::TestLed(false)
            );
        }
    }

    #[test]
    fn test_unknown_command() {
        let mut link = MockSensorLink::new();
        let mut session = EnrollmentSession::new();

        let reply = run(&mut link, &mut session, json!({"bogus": 1}));

        assert_eq!(reply, batch(json!({"error": "Unknown command: bogus"})));
    }

    #[test]
    fn test_empty_batch() {
        let mut link = MockSensorLink::new();
        let mut session = EnrollmentSession::new();

        assert!(run(&mut link, &mut session, json!({})).is_empty());
    }

    #[test]
    fn test_start_enrollment() {
        let mut link = MockSensorLink::new();
        let mut session = EnrollmentSession::new();

        let reply = run(&mut link, &mut session, json!({"start_enrollment": 5}));

        assert_eq!(
            reply,
            batch(json!({"message": "Enrollment started at slot 5. Place finger for scan 1."}))
        );
        assert_eq!(session.slot(), Some(SlotId::new(5)));
    }

    #[test]
    fn test_capture_when_idle() {
        let mut link = MockSensorLink::new();
        let mut session = EnrollmentSession::new();

        let reply = run(&mut link, &mut session, json!({"capture": true}));

        assert_eq!(
            reply,
            batch(json!({"error": "Enrollment not active. Run 'start_enrollment' first."}))
        );
    }

    #[test]
    fn test_stepwise_enrollment_through_batches() {
        let mut link = MockSensorLink::new();
        lenient_led(&mut link);
        link.expect_capture_image().times(2).returning(|| Ok(()));
        link.expect_image_to_template()
            .with(eq(CharBuffer::One))
            .times(1)
            .returning(|_| Ok(()));
        link.expect_image_to_template()
            .with(eq(CharBuffer::Two))
            .times(1)
            .returning(|_| Ok(()));
        link.expect_create_model().times(1).returning(|| Ok(()));
        link.expect_store_model()
            .with(eq(SlotId::new(3)))
            .times(1)
            .returning(|_| Ok(()));
        let mut session = EnrollmentSession::new();

        let reply = run(
            &mut link,
            &mut session,
            json!({"start_enrollment": 3, "capture": true}),
        );
        assert_eq!(
            reply[MESSAGE],
            json!(
                "Enrollment started at slot 3. Place finger for scan 1.; \
                 Step 1 completed. Remove finger and place again for step 2."
            )
        );

        let reply = run(&mut link, &mut session, json!({"capture": true}));
        assert_eq!(
            reply[MESSAGE],
            json!("Step 2 completed. Both scans captured. Call 'create_model'.")
        );

        let reply = run(&mut link, &mut session, json!({"create_model": true}));
        assert!(reply.contains_key(MESSAGE));
        assert!(!reply.contains_key(RESCAN_REQUIRED));

        let reply = run(&mut link, &mut session, json!({"store_model": 3}));
        assert_eq!(reply, batch(json!({"message": "Model stored successfully at slot 3."})));
        assert!(!session.is_active());
    }

    #[test]
    fn test_create_model_failure_requests_rescan() {
        let mut link = MockSensorLink::new();
        lenient_led(&mut link);
        link.expect_capture_image().returning(|| Ok(()));
        link.expect_image_to_template().returning(|_| Ok(()));
        link.expect_create_model()
            .times(1)
            .returning(|| Err(Error::sensor(Command::RegModel, ConfirmationCode::EnrollMismatch)));
        let mut session = EnrollmentSession::new();
        run(&mut link, &mut session, json!({"start_enrollment": 1, "capture": true}));
        run(&mut link, &mut session, json!({"capture": true}));

        let reply = run(&mut link, &mut session, json!({"create_model": true}));

        assert_eq!(reply[RESCAN_REQUIRED], json!(true));
        assert!(reply[ERROR].as_str().unwrap().starts_with("Failed to create model"));
        assert!(session.is_active());
    }

    #[test]
    fn test_create_model_before_scans_has_no_rescan_flag() {
        let mut link = MockSensorLink::new();
        let mut session = EnrollmentSession::new();

        let reply = run(
            &mut link,
            &mut session,
            json!({"start_enrollment": 1, "create_model": true}),
        );

        assert!(reply.contains_key(ERROR));
        assert!(!reply.contains_key(RESCAN_REQUIRED));
    }

    #[test]
    fn test_reset_enrollment() {
        let mut link = MockSensorLink::new();
        let mut session = EnrollmentSession::new();

        let reply = run(
            &mut link,
            &mut session,
            json!({"start_enrollment": 2, "reset_enrollment": true}),
        );

        assert_eq!(
            reply[MESSAGE],
            json!("Enrollment started at slot 2. Place finger for scan 1.; Enrollment state reset.")
        );
        assert!(!session.is_active());
    }

    #[test]
    fn test_match_fields_are_merged() {
        let mut link = MockSensorLink::new();
        lenient_led(&mut link);
        link.expect_capture_image().returning(|| Ok(()));
        link.expect_image_to_template().returning(|_| Ok(()));
        link.expect_search().returning(|| {
            Ok(SearchHit {
                matched_id: SlotId::new(4),
                confidence: 120,
            })
        });
        let mut session = EnrollmentSession::new();

        let reply = run(&mut link, &mut session, json!({"match_fingerprint": true}));

        assert_eq!(
            reply,
            batch(json!({"status": "match", "matched_id": 4, "confidence": 120}))
        );
    }

    #[test]
    fn test_match_without_finger() {
        let mut link = MockSensorLink::new();
        lenient_led(&mut link);
        link.expect_capture_image()
            .returning(|| Err(Error::sensor(Command::GenImg, ConfirmationCode::NoFinger)));
        let mut session = EnrollmentSession::new();

        let reply = run(&mut link, &mut session, json!({"match_fingerprint": true}));

        assert_eq!(reply, batch(json!({"status": "no_finger"})));
    }

    #[test]
    fn test_delete_model() {
        let mut link = MockSensorLink::new();
        link.expect_delete_model()
            .with(eq(SlotId::new(9)))
            .returning(|_| Ok(()));
        link.expect_delete_model()
            .with(eq(SlotId::new(10)))
            .returning(|_| Err(Error::sensor(Command::DeletChar, ConfirmationCode::FlashError)));
        let mut session = EnrollmentSession::new();

        let reply = run(&mut link, &mut session, json!({"delete_model": 9}));
        assert_eq!(reply, batch(json!({"message": "Deleted fingerprint at slot 9"})));

        let reply = run(&mut link, &mut session, json!({"delete_model": "10"}));
        assert!(reply[ERROR]
            .as_str()
            .unwrap()
            .starts_with("Failed to delete slot 10: "));
    }

    #[test]
    fn test_list_and_count_templates() {
        let mut link = MockSensorLink::new();
        link.expect_read_templates()
            .returning(|| Ok(vec![SlotId::new(0), SlotId::new(3), SlotId::new(17)]));
        link.expect_count_templates().returning(|| Ok(3));
        let mut session = EnrollmentSession::new();

        let reply = run(
            &mut link,
            &mut session,
            json!({"list_templates": true, "count_templates": true}),
        );

        assert_eq!(reply, batch(json!({"templates": [0, 3, 17], "count": 3})));
    }

    #[test]
    fn test_empty_library_lists_nothing() {
        let mut link = MockSensorLink::new();
        link.expect_read_templates().returning(|| Ok(Vec::new()));
        let mut session = EnrollmentSession::new();

        let reply = run(&mut link, &mut session, json!({"list_templates": true}));

        assert_eq!(reply, batch(json!({"templates": []})));
    }

    #[test]
    fn test_led_on_and_off() {
        let mut link = MockSensorLink::new();
        link.expect_set_led()
            .withf(|s| s.color == LedColor::Purple && s.mode == LedMode::Breathing)
            .times(1)
            .returning(|_| Ok(()));
        link.expect_set_led()
            .withf(|s| s.is_off())
            .times(1)
            .returning(|_| Ok(()));
        let mut session = EnrollmentSession::new();

        let reply = run(&mut link, &mut session, json!({"test_led": true}));
        assert_eq!(reply[MESSAGE], json!("LED turned on (purple breathing)"));

        let reply = run(&mut link, &mut session, json!({"test_led": false}));
        assert_eq!(reply[MESSAGE], json!("LED turned off"));
    }

    #[test]
    fn test_led_failure_is_reported() {
        let mut link = MockSensorLink::new();
        link.expect_set_led()
            .returning(|_| Err(r503_transport::Error::ConnectionClosed.into()));
        let mut session = EnrollmentSession::new();

        let reply = run(&mut link, &mut session, json!({"test_led": true}));

        assert!(reply[ERROR].as_str().unwrap().starts_with("LED test failed: "));
    }

    #[test]
    fn test_errors_accumulate_and_batch_continues() {
        let mut link = MockSensorLink::new();
        link.expect_count_templates().returning(|| Ok(12));
        let mut session = EnrollmentSession::new();

        let reply = run(
            &mut link,
            &mut session,
            json!({"bogus": 1, "capture": true, "count_templates": true}),
        );

        assert_eq!(
            reply[ERROR],
            json!("Unknown command: bogus; Enrollment not active. Run 'start_enrollment' first.")
        );
        assert_eq!(reply[COUNT], json!(12));
    }

    #[test]
    fn test_messages_and_errors_accumulate_separately() {
        let mut link = MockSensorLink::new();
        link.expect_delete_model().returning(|_| Ok(()));
        let mut session = EnrollmentSession::new();

        let reply = run(
            &mut link,
            &mut session,
            json!({"delete_model": 1, "capture": true, "delete_model ": 2, "reset_enrollment": true}),
        );

        assert_eq!(
            reply,
            batch(json!({
                "message": "Deleted fingerprint at slot 1; Enrollment state reset.",
                "error": "Enrollment not active. Run 'start_enrollment' first.; Unknown command: delete_model ",
            }))
        );
    }

    #[test]
    fn test_merge_fields_requires_an_object() {
        let mut reply = Reply::new();

        let err = merge_fields(&mut reply, 42).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));

        let unkeyable: std::collections::BTreeMap<(u8, u8), u8> = [((1, 2), 3)].into();
        assert!(matches!(
            merge_fields(&mut reply, unkeyable),
            Err(Error::Encoding(_))
        ));
        assert!(reply.is_empty());

        merge_fields(&mut reply, MatchResult::NoMatch).unwrap();
        assert_eq!(reply, batch(json!({"status": "no_match"})));
    }
}
