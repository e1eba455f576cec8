use super::*;
use serde_json::json;

#[test]
fn test_register_plugin_defaults() {
    let dto: RegisterPluginDto = serde_json::from_value(json!({
        "name": "OCR",
        "description": "Reads scanned documents",
        "version": "0.3.0",
        "endpoints": ["/ocr/scan"]
    }))
    .unwrap();

    assert!(dto.enabled);
    assert_eq!(dto.config, json!({}));
}

#[test]
fn test_register_plugin_requires_endpoints() {
    let result = serde_json::from_value::<RegisterPluginDto>(json!({
        "name": "OCR",
        "description": "Reads scanned documents",
        "version": "0.3.0"
    }));
    assert!(result.is_err());
}

#[test]
fn test_plugin_response_omits_endpoints_and_config() {
    let plugin = Plugin::new(
        "ocr".to_string(),
        "OCR".to_string(),
        "Reads scanned documents".to_string(),
        "0.3.0".to_string(),
        false,
        vec!["/ocr/scan".to_string()],
        json!({"lang": "eng"}),
    );
    let value = serde_json::to_value(PluginResponseDto::from(&plugin)).unwrap();

    assert_eq!(value["id"], "ocr");
    assert_eq!(value["enabled"], false);
    assert_eq!(value["status"], "registered");
    assert!(value.get("endpoints").is_none());
    assert!(value.get("config").is_none());
}

#[test]
fn test_create_task_optional_fields() {
    let dto: CreateTaskDto = serde_json::from_value(json!({
        "name": "Scrape",
        "description": "Scrape the pricing page",
        "steps": [{"type": "extract", "selector": ".price"}]
    }))
    .unwrap();

    assert!(dto.target_url.is_none());
    assert!(dto.schedule.is_none());
    assert_eq!(dto.steps.len(), 1);
}

#[test]
fn test_task_status_serializes_lowercase_state() {
    let status = TaskStatusDto {
        task_id: "task_1".to_string(),
        status: TaskState::Running,
        progress: Some(0.5),
        message: Some("Task is still running".to_string()),
    };
    let value = serde_json::to_value(status).unwrap();
    assert_eq!(value["status"], "running");
    assert_eq!(value["progress"], 0.5);
}

#[test]
fn test_api_dto_from_gateway_api() {
    let routes = vec![Route {
        path: "/charges".to_string(),
        methods: vec!["POST".to_string()],
        description: "Create a charge".to_string(),
        auth_required: true,
    }];
    let api = GatewayApi::new(
        "payments".to_string(),
        "Payments".to_string(),
        "/payments".to_string(),
        &routes,
        None,
        Some(json!({"type": "bearer"})),
    );
    let dto = ApiDto::try_from(&api).unwrap();

    assert_eq!(dto.id, "payments");
    assert_eq!(dto.routes, routes);
    assert_eq!(dto.auth_config, Some(json!({"type": "bearer"})));
}
