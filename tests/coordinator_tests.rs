/// End-to-end command tests: coordinator state, render cache and search sequencing
use predial_registry::config::{Config, DEFAULT_PAYMENT_YEARS};
use predial_registry::coordinator::{Command, CommandOutcome, Coordinator, FieldValue};
use predial_registry::forms::{DraftForm, EditForm, PaymentEdit};
use predial_registry::search::AttributeCriteria;
use predial_registry::visualization::VisualizationMode;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create test config
fn create_test_config(registry_base_url: String) -> Config {
    Config {
        port: 8080,
        registry_base_url,
        registry_timeout_secs: 5,
        payment_years: DEFAULT_PAYMENT_YEARS.to_vec(),
        default_neighborhood: "Centro".to_string(),
        default_district: "Puno".to_string(),
        map_fit_padding: 50,
    }
}

fn remote_record(id: i64, owner: &str, paid: &[bool]) -> serde_json::Value {
    let pagos: Vec<serde_json::Value> = paid
        .iter()
        .enumerate()
        .map(|(i, p)| json!({"anio": 2020 + i as i32, "pagado": p, "monto": 100}))
        .collect();
    json!({
        "id": id,
        "nombre": format!("casa {}", id),
        "propietario": owner,
        "direccion": {"calle": "Lima", "numero": id.to_string(), "barrio": "Centro", "distrito": "Puno"},
        "latitud": -15.80 - id as f64 / 100.0,
        "longitud": -70.00,
        "valor_catastral": 1000,
        "impuesto_anual": 100,
        "pagos": pagos
    })
}

async fn mount_list(mock_server: &MockServer, records: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/casas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(mock_server)
        .await;
}

fn markers_of(outcome: CommandOutcome) -> predial_registry::visualization::MarkerSet {
    match outcome {
        CommandOutcome::Render { markers }
        | CommandOutcome::SearchResults { markers, .. }
        | CommandOutcome::Created { markers, .. }
        | CommandOutcome::Updated { markers, .. }
        | CommandOutcome::Deleted { markers, .. } => markers,
        other => panic!("outcome carries no markers: {:?}", other),
    }
}

#[tokio::test]
async fn test_toggle_alternates_and_one_shot_views_leave_it_alone() {
    let mock_server = MockServer::start().await;
    mount_list(&mock_server, json!([remote_record(1, "Ana", &[true, false])])).await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    coordinator.dispatch(Command::Reload).await.unwrap();

    let first = markers_of(coordinator.dispatch(Command::ToggleColorMode).await.unwrap());
    assert_eq!(first.mode, Some(VisualizationMode::Normal));

    let debt = markers_of(coordinator.dispatch(Command::ShowDebtOnly).await.unwrap());
    assert_eq!(debt.mode, Some(VisualizationMode::DebtOnly));

    let second = markers_of(coordinator.dispatch(Command::ToggleColorMode).await.unwrap());
    assert_eq!(second.mode, Some(VisualizationMode::RatioColor));

    let third = markers_of(coordinator.dispatch(Command::ToggleColorMode).await.unwrap());
    assert_eq!(third.mode, Some(VisualizationMode::Normal));
}

#[tokio::test]
async fn test_hide_markers_clears_current_view() {
    let mock_server = MockServer::start().await;
    mount_list(&mock_server, json!([remote_record(1, "Ana", &[true])])).await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    coordinator.dispatch(Command::Reload).await.unwrap();
    assert_eq!(coordinator.current_markers().await.len(), 1);

    let hidden = markers_of(coordinator.dispatch(Command::HideMarkers).await.unwrap());
    assert!(hidden.is_empty());
    assert_eq!(hidden.mode, None);
    assert!(coordinator.current_markers().await.is_empty());
}

#[tokio::test]
async fn test_create_invalidates_cached_render() {
    let mock_server = MockServer::start().await;
    mount_list(&mock_server, json!([remote_record(1, "Ana", &[true])])).await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    let before = markers_of(coordinator.dispatch(Command::Reload).await.unwrap());
    assert_eq!(before.record_ids(), vec![1]);

    mock_server.reset().await;
    Mock::given(method("POST"))
        .and(path("/agregar_casa"))
        .and(body_partial_json(json!({"propietario": "X", "latitud": -15.85, "longitud": -70.01})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2})))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_list(
        &mock_server,
        json!([remote_record(1, "Ana", &[true]), remote_record(2, "X", &[false])]),
    )
    .await;

    let form = DraftForm {
        street: "Lima".to_string(),
        owner: "X".to_string(),
        annual_tax: Some(100.0),
        coordinates: Some("-15.85, -70.01".to_string()),
        ..DraftForm::default()
    };
    let outcome = coordinator.dispatch(Command::CreateRecord(form)).await.unwrap();
    let after = match outcome {
        CommandOutcome::Created { id, markers, reload_error } => {
            assert_eq!(id, 2);
            assert!(reload_error.is_none());
            markers
        }
        other => panic!("unexpected outcome {:?}", other),
    };

    assert_eq!(after.record_ids(), vec![1, 2]);
    assert_ne!(before.fingerprint, after.fingerprint);
    assert_eq!(coordinator.current_markers().await, after);
}

#[tokio::test]
async fn test_invalid_draft_sends_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agregar_casa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    let form = DraftForm {
        owner: "X".to_string(),
        coordinates: Some("somewhere".to_string()),
        ..DraftForm::default()
    };
    let err = coordinator.dispatch(Command::CreateRecord(form)).await.unwrap_err();
    assert!(err.is_validation());
    assert!(coordinator.records().await.is_empty());
}

#[tokio::test]
async fn test_stale_search_response_is_discarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/buscar"))
        .and(body_json(json!({"direccion": "Lento"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([remote_record(1, "Ana", &[true])]))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/buscar"))
        .and(body_json(json!({"direccion": "Rapido"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([remote_record(2, "Luz", &[false])])))
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    let slow = Command::Search(AttributeCriteria {
        street: Some("Lento".to_string()),
        ..AttributeCriteria::default()
    });
    let fast = Command::Search(AttributeCriteria {
        street: Some("Rapido".to_string()),
        ..AttributeCriteria::default()
    });

    let (slow_outcome, fast_outcome) = tokio::join!(coordinator.dispatch(slow), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        coordinator.dispatch(fast).await
    });

    assert!(matches!(slow_outcome.unwrap(), CommandOutcome::Stale));
    match fast_outcome.unwrap() {
        CommandOutcome::SearchResults { total, summary, markers } => {
            assert_eq!(total, 1);
            assert!(summary.starts_with("Se encontraron 1 casa(s):"));
            assert_eq!(markers.record_ids(), vec![2]);
            assert!(markers.fit.is_some());
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let shown = coordinator.current_markers().await;
    assert_eq!(shown.mode, Some(VisualizationMode::SearchResult));
    assert_eq!(shown.record_ids(), vec![2]);
}

#[tokio::test]
async fn test_empty_search_keeps_current_markers() {
    let mock_server = MockServer::start().await;
    mount_list(&mock_server, json!([remote_record(1, "Ana", &[true])])).await;
    Mock::given(method("POST"))
        .and(path("/buscar_cercanas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultados": []})))
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    let shown = markers_of(coordinator.dispatch(Command::Reload).await.unwrap());

    let outcome = coordinator
        .dispatch(Command::SearchNearby {
            reference: FieldValue::Number(1.0),
            radius: FieldValue::Text("50".to_string()),
        })
        .await
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::NoMatch { .. }));
    assert_eq!(coordinator.current_markers().await, shown);
}

#[tokio::test]
async fn test_select_edit_and_delete_flow() {
    let mock_server = MockServer::start().await;
    mount_list(
        &mock_server,
        json!([remote_record(1, "Ana Quispe", &[true, false]), remote_record(2, "Luz", &[])]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/editar_casa"))
        .and(body_partial_json(json!({
            "id": 1,
            "nombre": "casa 1",
            "propietario": "Ana Q.",
            "pagos": [
                {"anio": 2020, "pagado": true, "monto": 100.0},
                {"anio": 2021, "pagado": true, "monto": 100.0}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/eliminar_casa"))
        .and(body_json(json!({"id": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    coordinator.dispatch(Command::Reload).await.unwrap();

    // Editing without a selection is rejected locally
    let err = coordinator
        .dispatch(Command::SubmitEdit(EditForm::default()))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let selected = coordinator
        .dispatch(Command::SelectRecord {
            owner: Some("  ana quispe ".to_string()),
            id: None,
        })
        .await
        .unwrap();
    assert!(matches!(selected, CommandOutcome::Selected { ref record } if record.id == 1));

    let form = EditForm {
        name: None,
        street: "Lima".to_string(),
        owner: "Ana Q.".to_string(),
        annual_tax: Some(100.0),
        assessed_value: Some(1000.0),
        payments: vec![
            PaymentEdit { paid: Some(true), amount: None },
            PaymentEdit { paid: Some(true), amount: Some(100.0) },
        ],
        ..EditForm::default()
    };
    let updated = coordinator.dispatch(Command::SubmitEdit(form)).await.unwrap();
    assert!(matches!(updated, CommandOutcome::Updated { id: 1, .. }));
    assert!(coordinator.selected().await.is_none());

    let selected = coordinator
        .dispatch(Command::SelectRecord {
            owner: None,
            id: Some(FieldValue::Text("2".to_string())),
        })
        .await
        .unwrap();
    assert!(matches!(selected, CommandOutcome::Selected { .. }));

    let deleted = coordinator.dispatch(Command::DeleteSelected).await.unwrap();
    assert!(matches!(deleted, CommandOutcome::Deleted { id: 2, .. }));
    assert!(coordinator.selected().await.is_none());
}

#[tokio::test]
async fn test_lookup_without_match() {
    let mock_server = MockServer::start().await;
    mount_list(&mock_server, json!([remote_record(1, "Ana", &[])])).await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    coordinator.dispatch(Command::Reload).await.unwrap();

    let outcome = coordinator
        .dispatch(Command::SelectRecord {
            owner: Some("Nadie".to_string()),
            id: None,
        })
        .await
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::NoMatch { .. }));
    assert!(coordinator.selected().await.is_none());

    let err = coordinator
        .dispatch(Command::SelectRecord { owner: None, id: None })
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_statistics_follow_reload() {
    let mock_server = MockServer::start().await;
    mount_list(
        &mock_server,
        json!([
            remote_record(1, "Ana", &[true, false]),
            remote_record(2, "Luz", &[false]),
            remote_record(3, "Eva", &[true, true])
        ]),
    )
    .await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    coordinator.dispatch(Command::Reload).await.unwrap();

    match coordinator.dispatch(Command::Statistics).await.unwrap() {
        CommandOutcome::Statistics { report } => {
            assert_eq!(report.overview.total, 3);
            assert_eq!(report.overview.fully_paid, 1);
            assert_eq!(report.histogram.buckets, [1, 1, 1, 0, 0, 0]);
            assert_eq!(report.streets.len(), 1);
            assert_eq!((report.streets[0].paid, report.streets[0].unpaid), (2, 1));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_outstanding_create_does_not_block_other_commands() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agregar_casa"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 2}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;
    mount_list(&mock_server, json!([remote_record(2, "X", &[])])).await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    let form = DraftForm {
        owner: "X".to_string(),
        coordinates: Some("-15.82, -70.0".to_string()),
        ..DraftForm::default()
    };

    let (created, toggle_elapsed) = tokio::join!(coordinator.dispatch(Command::CreateRecord(form)), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let started = tokio::time::Instant::now();
        coordinator.dispatch(Command::ToggleColorMode).await.unwrap();
        coordinator.statistics().await;
        started.elapsed()
    });

    assert!(
        toggle_elapsed < Duration::from_millis(500),
        "toggle took {:?} while a create was outstanding",
        toggle_elapsed
    );
    assert!(matches!(created.unwrap(), CommandOutcome::Created { id: 2, .. }));
    assert_eq!(coordinator.records().await.len(), 1);
}

#[tokio::test]
async fn test_create_reported_when_reload_fails() {
    let mock_server = MockServer::start().await;
    mount_list(&mock_server, json!([remote_record(1, "Ana", &[true])])).await;

    let coordinator = Coordinator::new(&create_test_config(mock_server.uri())).unwrap();
    coordinator.dispatch(Command::Reload).await.unwrap();

    mock_server.reset().await;
    Mock::given(method("POST"))
        .and(path("/agregar_casa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/casas"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let form = DraftForm {
        owner: "X".to_string(),
        coordinates: Some("-15.85, -70.01".to_string()),
        ..DraftForm::default()
    };
    match coordinator.dispatch(Command::CreateRecord(form)).await.unwrap() {
        CommandOutcome::Created { id, markers, reload_error } => {
            assert_eq!(id, 5);
            assert!(reload_error.unwrap().contains("Record 5 was created"));
            // last loaded records stay on the map
            assert_eq!(markers.record_ids(), vec![1]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(coordinator.records().await.len(), 1);
}
