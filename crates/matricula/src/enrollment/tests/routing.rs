use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use crate::directory::students::StudentStatus;
use crate::enrollment::router::{matricula_router, request_router};

use super::common::{fixture, new_payload, seed_student, Fixture};

fn app(fx: &Fixture) -> Router {
    request_router(fx.service.clone()).merge(matricula_router(fx.service.clone()))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json payload")
}

fn valid_new_body() -> Value {
    let p = new_payload("12345678", "2024-11-02");
    json!({
        "nombre_estudiante": p.nombre_estudiante,
        "dni_estudiante": p.dni_estudiante,
        "fecha_nacimiento": p.fecha_nacimiento,
        "genero": p.genero,
        "grado_solicitado": p.grado_solicitado,
        "direccion": p.direccion,
        "nombre_apoderado": p.nombre_apoderado,
        "dni_apoderado": p.dni_apoderado,
        "parentesco": p.parentesco,
        "ocupacion": p.ocupacion,
        "grado_instruccion": p.grado_instruccion,
        "telefono": p.telefono,
        "email": p.email,
        "direccion_apoderado": p.direccion_apoderado,
        "anio_escolar": p.anio_escolar,
        "fecha_solicitud": p.fecha_solicitud,
    })
}

#[tokio::test]
async fn create_new_returns_created_with_an_id() {
    let fx = fixture();
    let response = app(&fx)
        .oneshot(json_request("POST", "/api/solicitudes/nueva", valid_new_body()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = body_json(response).await;
    assert!(payload.get("id").and_then(Value::as_i64).is_some());
}

#[tokio::test]
async fn bad_year_label_is_rejected_with_bad_request() {
    let fx = fixture();
    let mut body = valid_new_body();
    body["anio_escolar"] = json!("25");
    let response = app(&fx)
        .oneshot(json_request("POST", "/api/solicitudes/nueva", body))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert!(payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("4 numeric digits"));
}

#[tokio::test]
async fn unknown_request_id_is_not_found() {
    let fx = fixture();
    let response = app(&fx)
        .oneshot(
            Request::builder()
                .uri("/api/solicitudes/nueva/999")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dni_read_requires_the_query_parameter() {
    let fx = fixture();
    let response = app(&fx)
        .oneshot(
            Request::builder()
                .uri("/api/solicitudes/nueva/dni")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert_eq!(
        payload.get("message").and_then(Value::as_str),
        Some("the student dni is required")
    );
}

#[tokio::test]
async fn promotion_create_surfaces_the_eligibility_message() {
    let fx = fixture();
    let student = seed_student(&fx.students, "12345678", 6, StudentStatus::Active);
    let body = json!({
        "estudiante_id": student.id,
        "grado_actual": 6,
        "grado_siguiente": 6,
        "anio_escolar_actual": "2024",
        "anio_escolar_siguiente": "2025",
        "fecha_solicitud": "2024-11-02",
    });
    let response = app(&fx)
        .oneshot(json_request("POST", "/api/solicitudes/siguiente", body))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = body_json(response).await;
    assert_eq!(
        payload.get("message").and_then(Value::as_str),
        Some("student is already in the final grade")
    );
}

#[tokio::test]
async fn matriculas_view_lists_tagged_rows() {
    let fx = fixture();
    app(&fx)
        .oneshot(json_request("POST", "/api/solicitudes/nueva", valid_new_body()))
        .await
        .expect("router responds");

    let response = app(&fx)
        .oneshot(
            Request::builder()
                .uri("/api/matriculas")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    let rows = payload.as_array().expect("array payload");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("tipo_matricula").and_then(Value::as_str),
        Some("nueva")
    );
}

#[tokio::test]
async fn matricula_create_endpoints_write_into_the_variant_tables() {
    let fx = fixture();
    let response = app(&fx)
        .oneshot(json_request("POST", "/api/matriculas/nueva", valid_new_body()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);

    let stored = fx.service.get_new(1).expect("row landed in the new table");
    assert_eq!(stored.dni_estudiante, "12345678");
}
