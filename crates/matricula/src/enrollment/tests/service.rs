use crate::directory::students::StudentStatus;
use crate::enrollment::domain::{PromotionRequestPayload, RequestStatus, TransferRequestPayload};
use crate::error::ApiError;

use super::common::{
    assert_pending, fixture, new_payload, promotion_payload, seed_student, transfer_payload,
};

#[test]
fn create_new_defaults_to_pending_and_round_trips() {
    let fx = fixture();
    let id = fx
        .service
        .create_new(new_payload("12345678", "2024-11-02"))
        .expect("request created");
    let stored = fx.service.get_new(id).expect("request fetched");
    assert_pending(stored.estado);
    assert_eq!(stored.dni_estudiante, "12345678");
    assert_eq!(stored.nombre_apoderado, "Rosa Quispe");
    assert_eq!(stored.anio_escolar, "2025");
    assert_eq!(stored.email.as_deref(), Some("rosa.quispe@example.com"));
}

#[test]
fn create_new_rejects_missing_required_fields() {
    let fx = fixture();
    let mut payload = new_payload("12345678", "2024-11-02");
    payload.telefono = None;
    match fx.service.create_new(payload) {
        Err(ApiError::Validation(msg)) => {
            assert!(msg.contains("required except email, estado and comentarios"))
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn year_label_format_is_rejected_across_all_variants() {
    let fx = fixture();
    let student = seed_student(&fx.students, "12345678", 3, StudentStatus::Active);

    let mut bad_new = new_payload("12345678", "2024-11-02");
    bad_new.anio_escolar = Some("25".to_string());
    assert!(matches!(
        fx.service.create_new(bad_new),
        Err(ApiError::Validation(_))
    ));

    let mut bad_transfer = transfer_payload("12345678", "2024-11-02");
    bad_transfer.base.anio_escolar = Some("veinte25".to_string());
    assert!(matches!(
        fx.service.create_transfer(bad_transfer),
        Err(ApiError::Validation(_))
    ));

    let mut bad_promotion = promotion_payload(student.id, "2024-11-02");
    bad_promotion.anio_escolar_siguiente = Some("20255".to_string());
    assert!(matches!(
        fx.service.create_promotion(bad_promotion),
        Err(ApiError::Validation(_))
    ));
}

#[test]
fn invalid_status_lists_the_allowed_values() {
    let fx = fixture();
    let mut payload = new_payload("12345678", "2024-11-02");
    payload.estado = Some("archivada".to_string());
    match fx.service.create_new(payload) {
        Err(ApiError::Validation(msg)) => {
            assert!(msg.contains("pendiente, aprobada, rechazada"))
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn transfer_requires_the_prior_school() {
    let fx = fixture();
    let mut payload = transfer_payload("12345678", "2024-11-02");
    payload.colegio_anterior = None;
    match fx.service.create_transfer(payload) {
        Err(ApiError::Validation(msg)) => assert!(msg.contains("motivo_traslado")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn transfer_round_trips_prior_school_and_reason() {
    let fx = fixture();
    let id = fx
        .service
        .create_transfer(transfer_payload("12345678", "2024-11-02"))
        .expect("transfer created");
    let stored = fx.service.get_transfer(id).expect("transfer fetched");
    assert_eq!(stored.colegio_anterior, "IE San Martín");
    assert_eq!(stored.motivo_traslado.as_deref(), Some("cambio de domicilio"));
}

#[test]
fn promotion_create_lists_missing_fields() {
    let fx = fixture();
    let payload = PromotionRequestPayload {
        estudiante_id: Some(1),
        ..PromotionRequestPayload::default()
    };
    match fx.service.create_promotion(payload) {
        Err(ApiError::Validation(msg)) => {
            assert!(msg.starts_with("missing required fields:"));
            assert!(msg.contains("grado_actual"));
            assert!(msg.contains("fecha_solicitud"));
            assert!(!msg.contains("estudiante_id"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn promotion_create_requires_an_existing_student() {
    let fx = fixture();
    assert!(matches!(
        fx.service.create_promotion(promotion_payload(404, "2024-11-02")),
        Err(ApiError::NotFound("student"))
    ));
}

#[test]
fn promotion_create_rejects_final_grade_students() {
    let fx = fixture();
    let student = seed_student(&fx.students, "12345678", 6, StudentStatus::Active);
    let mut payload = promotion_payload(student.id, "2024-11-02");
    payload.grado_actual = Some(6);
    payload.grado_siguiente = Some(6);
    match fx.service.create_promotion(payload) {
        Err(ApiError::Validation(msg)) => {
            assert_eq!(msg, "student is already in the final grade")
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn promotion_create_rejects_inactive_students() {
    let fx = fixture();
    let student = seed_student(&fx.students, "12345678", 3, StudentStatus::Inactive);
    match fx.service.create_promotion(promotion_payload(student.id, "2024-11-02")) {
        Err(ApiError::Validation(msg)) => {
            assert_eq!(msg, "student is not active in the system")
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn promotion_create_enforces_the_next_grade_rule() {
    let fx = fixture();
    let student = seed_student(&fx.students, "12345678", 3, StudentStatus::Active);
    let mut payload = promotion_payload(student.id, "2024-11-02");
    payload.grado_siguiente = Some(6);
    match fx.service.create_promotion(payload) {
        Err(ApiError::Validation(msg)) => {
            assert_eq!(msg, "grado_siguiente must be grado_actual plus one")
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn promotion_create_rejects_bad_dates() {
    let fx = fixture();
    let student = seed_student(&fx.students, "12345678", 3, StudentStatus::Active);
    let mut payload = promotion_payload(student.id, "2024-11-02");
    payload.fecha_solicitud = Some("02/11/2024".to_string());
    match fx.service.create_promotion(payload) {
        Err(ApiError::Validation(msg)) => assert!(msg.contains("YYYY-MM-DD")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn promotion_create_succeeds_for_eligible_students() {
    let fx = fixture();
    let student = seed_student(&fx.students, "12345678", 3, StudentStatus::Active);
    let id = fx
        .service
        .create_promotion(promotion_payload(student.id, "2024-11-02"))
        .expect("promotion created");
    let stored = fx.service.get_promotion(id).expect("promotion fetched");
    assert_eq!(stored.estudiante_id, student.id);
    assert_eq!(stored.grado_siguiente, 4);
    assert_pending(stored.estado);
}

#[test]
fn updates_require_at_least_one_field() {
    let fx = fixture();
    let id = fx
        .service
        .create_new(new_payload("12345678", "2024-11-02"))
        .expect("request created");
    assert!(matches!(
        fx.service.update_new(id, Default::default()),
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(
        fx.service.update_transfer(1, TransferRequestPayload::default()),
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(
        fx.service
            .update_promotion(1, PromotionRequestPayload::default()),
        Err(ApiError::Validation(_))
    ));
}

#[test]
fn update_of_unknown_request_is_not_found() {
    let fx = fixture();
    let mut payload = crate::enrollment::domain::NewRequestPayload::default();
    payload.estado = Some("aprobada".to_string());
    assert!(matches!(
        fx.service.update_new(99, payload),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn update_can_flip_the_flat_status_field() {
    let fx = fixture();
    let id = fx
        .service
        .create_new(new_payload("12345678", "2024-11-02"))
        .expect("request created");

    let mut approve = crate::enrollment::domain::NewRequestPayload::default();
    approve.estado = Some("aprobada".to_string());
    fx.service.update_new(id, approve).expect("approved");

    // No transition guard: a terminal-looking status can be reopened.
    let mut reopen = crate::enrollment::domain::NewRequestPayload::default();
    reopen.estado = Some("pendiente".to_string());
    fx.service.update_new(id, reopen).expect("reopened");

    let stored = fx.service.get_new(id).expect("request fetched");
    assert_eq!(stored.estado, RequestStatus::Pending);
}

#[test]
fn delete_of_unknown_request_is_not_found() {
    let fx = fixture();
    assert!(matches!(
        fx.service.delete_new(7),
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        fx.service.delete_transfer(7),
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        fx.service.delete_promotion(7),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn dni_reads_validate_the_dni_format() {
    let fx = fixture();
    assert!(matches!(
        fx.service.new_by_dni("123"),
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(
        fx.service.transfers_by_dni("abcdefgh"),
        Err(ApiError::Validation(_))
    ));
    assert!(matches!(
        fx.service.promotions_by_dni("123456789"),
        Err(ApiError::Validation(_))
    ));
}

#[test]
fn dni_envelope_distinguishes_known_students_without_requests() {
    let fx = fixture();
    seed_student(&fx.students, "12345678", 3, StudentStatus::Active);

    let envelope = fx.service.new_by_dni("12345678").expect("envelope built");
    assert!(envelope.success);
    assert_eq!(envelope.total_solicitudes, 0);
    assert_eq!(envelope.nombre_estudiante.as_deref(), Some("Lucía Fernández"));
    assert!(envelope.mensaje.is_some());

    let unknown = fx.service.new_by_dni("99998888").expect("envelope built");
    assert_eq!(unknown.total_solicitudes, 0);
    assert!(unknown.nombre_estudiante.is_none());
    assert!(unknown.mensaje.is_none());
}

#[test]
fn dni_envelope_sorts_requests_newest_first() {
    let fx = fixture();
    fx.service
        .create_new(new_payload("12345678", "2024-01-15"))
        .expect("older request");
    fx.service
        .create_new(new_payload("12345678", "2024-09-30"))
        .expect("newer request");

    let envelope = fx.service.new_by_dni("12345678").expect("envelope built");
    assert_eq!(envelope.total_solicitudes, 2);
    let dates: Vec<_> = envelope
        .solicitudes
        .iter()
        .map(|r| r.fecha_solicitud)
        .collect();
    assert!(dates[0] > dates[1]);
}

#[test]
fn promotion_dni_read_goes_through_the_student_fk() {
    let fx = fixture();
    let student = seed_student(&fx.students, "12345678", 3, StudentStatus::Active);
    fx.service
        .create_promotion(promotion_payload(student.id, "2024-11-02"))
        .expect("promotion created");

    let envelope = fx
        .service
        .promotions_by_dni("12345678")
        .expect("envelope built");
    assert_eq!(envelope.total_solicitudes, 1);
    assert_eq!(envelope.solicitudes[0].estudiante_id, student.id);
    assert_eq!(envelope.nombre_estudiante.as_deref(), Some("Lucía Fernández"));
}
