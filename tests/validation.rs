// tests/validation.rs
use glam::DVec3;
use pipetteer::{
    Container, DriverCall, LabwareRegistry, ProtocolCompiler, ProtocolDocument, ProtocolError,
    TraceDriver, Well,
};
use serde_json::json;

struct BenchRegistry;

impl LabwareRegistry for BenchRegistry {
    fn resolve(&self, labware: &str, _slot: &str) -> Option<Container> {
        match labware {
            "tiprack-10ul" => Some(Container::new(
                "",
                vec![
                    Well::new("A1", DVec3::new(0.0, 0.0, 0.0)),
                    Well::new("A2", DVec3::new(9.0, 0.0, 0.0)),
                ],
            )),
            "96-flat" => Some(Container::new(
                "",
                vec![
                    Well::new("A1", DVec3::new(0.0, 0.0, 0.0)),
                    Well::new("A2", DVec3::new(9.0, 0.0, 0.0)),
                ],
            )),
            "point" => Some(Container::new("", vec![Well::new("A1", DVec3::ZERO)])),
            _ => None,
        }
    }
}

fn base_document() -> serde_json::Value {
    json!({
        "head": {
            "p200": {
                "tool": "pipette",
                "axis": "b",
                "volume": 20,
                "multi-channel": false,
                "tip-racks": [{"container": "tips"}],
                "trash-container": {"container": "trash"},
                "points": []
            }
        },
        "deck": {
            "tips": {"labware": "tiprack-10ul", "slot": "A1"},
            "plate": {"labware": "96-flat", "slot": "B1"},
            "trash": {"labware": "point", "slot": "B2"}
        },
        "instructions": []
    })
}

fn submit(value: serde_json::Value) -> (Result<(), ProtocolError>, TraceDriver) {
    let document = ProtocolDocument::from_value(value).expect("fixture parses");
    let mut driver = TraceDriver::new();
    let result = ProtocolCompiler::new(document)
        .submit(&BenchRegistry, &mut driver)
        .map(|_| ());
    (result, driver)
}

#[test]
fn complete_document_validates_clean() {
    let mut value = base_document();
    value["ingredients"] = json!({});
    let document = ProtocolDocument::from_value(value).expect("fixture parses");

    let report = document.validate();
    assert!(report.is_clean());
    assert!(report.warnings.is_empty());
}

#[test]
fn missing_ingredients_is_one_warning_never_an_error() {
    let document = ProtocolDocument::from_value(base_document()).expect("fixture parses");

    let report = document.validate();
    assert!(report.is_clean());
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn missing_sections_collect_one_error_each() {
    let document = ProtocolDocument::from_json("{}").expect("empty object parses");

    let report = document.validate();
    assert_eq!(report.errors.len(), 3, "head, deck, and instructions");
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn validation_errors_abort_before_any_driver_call() {
    let (result, driver) = submit(json!({"deck": {}, "instructions": []}));

    assert!(matches!(result, Err(ProtocolError::Validation(ref errors)) if errors.len() == 1));
    assert!(driver.calls.is_empty(), "no motion on a failed validation");
}

#[test]
fn unknown_tool_option_fails_before_any_instruction() {
    let mut value = base_document();
    value["head"]["p200"]["color"] = json!("blue");
    value["instructions"] = json!([
        {"tool": "p200", "groups": [
            {"transfer": [{"from": {"container": "plate", "location": "A1"},
                           "to": {"container": "plate", "location": "A2"}, "volume": 1}]}
        ]}
    ]);
    let (result, driver) = submit(value);

    assert!(
        matches!(result, Err(ProtocolError::ConfigKey { ref tool, ref key })
            if tool == "p200" && key == "color")
    );
    assert!(driver.calls.is_empty());
}

#[test]
fn unknown_command_tag_aborts_mid_group_without_dropping() {
    let mut value = base_document();
    value["instructions"] = json!([
        {"tool": "p200", "groups": [{"foo": {"volume": 1}}]}
    ]);
    let (result, driver) = submit(value);

    assert!(matches!(result, Err(ProtocolError::UnsupportedCommand(ref tag)) if tag == "foo"));
    assert!(
        driver
            .calls
            .iter()
            .any(|c| matches!(c, DriverCall::PickUpTip(_))),
        "the tip was already picked up when the bad tag was hit"
    );
    assert!(
        !driver
            .calls
            .iter()
            .any(|c| matches!(c, DriverCall::DropTip { .. })),
        "the trailing drop for the failed group is never issued"
    );
}

#[test]
fn unknown_tool_reference_is_fatal() {
    let mut value = base_document();
    value["instructions"] = json!([{"tool": "p9000", "groups": []}]);
    let (result, _) = submit(value);

    assert!(matches!(result, Err(ProtocolError::Reference(_))));
}

#[test]
fn unknown_container_in_command_is_fatal() {
    let mut value = base_document();
    value["instructions"] = json!([
        {"tool": "p200", "groups": [
            {"transfer": [{"from": {"container": "ghost", "location": "A1"},
                           "to": {"container": "plate", "location": "A2"}, "volume": 1}]}
        ]}
    ]);
    let (result, _) = submit(value);

    assert!(matches!(result, Err(ProtocolError::Reference(_))));
}

#[test]
fn unresolved_tip_rack_is_fatal_before_instructions() {
    let mut value = base_document();
    value["head"]["p200"]["tip-racks"] = json!([{"container": "nowhere"}]);
    let (result, driver) = submit(value);

    assert!(matches!(result, Err(ProtocolError::Reference(_))));
    assert!(driver.calls.is_empty());
}

#[test]
fn unknown_labware_is_fatal() {
    let mut value = base_document();
    value["deck"]["plate"] = json!({"labware": "hovercraft", "slot": "B1"});
    let (result, driver) = submit(value);

    assert!(matches!(result, Err(ProtocolError::Reference(_))));
    assert!(driver.calls.is_empty());
}

#[test]
fn loader_accepts_raw_text_and_files() {
    let text = base_document().to_string();

    let from_text = ProtocolDocument::load(&text).expect("raw JSON text loads");
    assert!(from_text.validate().is_clean());

    let path = std::env::temp_dir().join(format!("pipetteer-load-{}.json", std::process::id()));
    std::fs::write(&path, &text).expect("fixture file writes");
    let from_file =
        ProtocolDocument::load(path.to_str().expect("utf-8 path")).expect("file loads");
    assert!(from_file.validate().is_clean());
    std::fs::remove_file(&path).ok();
}

#[test]
fn loader_rejects_garbage() {
    let result = ProtocolDocument::load("not a protocol at all");
    assert!(matches!(result, Err(ProtocolError::Format(_))));
}

#[test]
fn duplicate_deck_names_take_the_last_declaration() {
    let text = r#"{
        "deck": {
            "plate": {"labware": "tube-rack", "slot": "A1"},
            "plate": {"labware": "96-flat", "slot": "B1"}
        }
    }"#;
    let document = ProtocolDocument::from_json(text).expect("parses");

    let deck = document.deck.expect("deck present");
    assert_eq!(deck.len(), 1);
    assert_eq!(deck["plate"].labware, "96-flat");
}
