//! Session input loading, validation and task planning from files

use pixbatch::error::ApiError;
use pixbatch::input::SessionInput;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_session(temp: &TempDir, value: serde_json::Value) -> PathBuf {
    let path = temp.path().join("session.json");
    std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    path
}

#[test]
fn session_file_loads_into_ordered_groups() {
    let temp = TempDir::new().unwrap();
    let path = write_session(
        &temp,
        json!({
            "session_name": "village_01",
            "sprite_type": "map_object",
            "sprite_groups": [
                {
                    "name": "houses",
                    "output_folder": "assets/houses",
                    "default_params": { "width": 64, "height": 64, "outline": "single color black outline" },
                    "sprites": [
                        { "id": "cottage", "prompt": "thatched cottage" },
                        { "id": "tower", "prompt": "stone tower", "params": { "height": 128 } }
                    ]
                },
                {
                    "name": "fences",
                    "output_folder": "assets/fences",
                    "sprites": [ { "id": "gate", "prompt": "wooden gate", "notes": "needs door variant" } ]
                }
            ]
        }),
    );

    let plan = SessionInput::load(&path).unwrap().validate().unwrap();
    assert_eq!(plan.session_name, "village_01");
    assert_eq!(plan.sprite_type, "map_object");

    let names: Vec<&str> = plan.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["houses", "fences"]);

    let tower = &plan.groups[0].requests[1];
    assert_eq!(tower.params.size_label(), "64x128");
    assert_eq!(
        tower.params.get("outline"),
        Some(&json!("single color black outline"))
    );

    let list = plan.task_list("png");
    assert_eq!(list.total_sprites, 3);
    assert_eq!(list.tasks[2].notes, "needs door variant");
    assert_eq!(
        list.tasks[0].output_path,
        PathBuf::from("assets/houses/cottage.png")
    );
}

#[test]
fn task_list_serializes_with_stable_field_names() {
    let temp = TempDir::new().unwrap();
    let path = write_session(
        &temp,
        json!({
            "session_name": "s",
            "sprite_type": "map_object",
            "groups": [
                { "name": "g", "output_location": "out", "items": [ { "id": "a", "prompt": "p" } ] }
            ]
        }),
    );

    let plan = SessionInput::load(&path).unwrap().validate().unwrap();
    let value = serde_json::to_value(plan.task_list("png")).unwrap();
    assert_eq!(value["session_name"], "s");
    assert_eq!(value["total_sprites"], 1);
    let task = &value["tasks"][0];
    for field in [
        "sprite_id",
        "group_name",
        "output_folder",
        "output_path",
        "prompt",
        "params",
        "notes",
    ] {
        assert!(task.get(field).is_some(), "missing field {}", field);
    }
}

#[test]
fn missing_file_is_invalid_input() {
    let temp = TempDir::new().unwrap();
    let err = SessionInput::load(&temp.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(ref problems) if problems.len() == 1));
}

#[test]
fn blank_fields_count_as_missing() {
    let temp = TempDir::new().unwrap();
    let path = write_session(
        &temp,
        json!({
            "session_name": "   ",
            "sprite_type": "map_object",
            "sprite_groups": [
                { "name": "g", "output_folder": "out", "sprites": [ { "id": "a", "prompt": "" } ] }
            ]
        }),
    );

    let err = SessionInput::load(&path).unwrap().validate().unwrap_err();
    let ApiError::InvalidInput(problems) = err else {
        panic!("expected InvalidInput");
    };
    assert_eq!(
        problems,
        vec![
            "missing required field 'session_name'".to_string(),
            "sprite 'a' missing 'prompt'".to_string(),
        ]
    );
}
