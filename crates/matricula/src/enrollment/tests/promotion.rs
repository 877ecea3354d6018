use crate::directory::students::StudentStatus;
use crate::enrollment::promotion::{evaluate, next_grade, FINAL_GRADE};

#[test]
fn eligibility_matches_the_decision_table() {
    for grade in 1..=6u8 {
        for estado in [StudentStatus::Active, StudentStatus::Inactive] {
            let decision = evaluate(estado, grade);
            let expected = estado == StudentStatus::Active && grade < FINAL_GRADE;
            assert_eq!(
                decision.puede_promocionar, expected,
                "estado {estado:?}, grade {grade}"
            );
        }
    }
}

#[test]
fn next_grade_saturates_at_the_final_grade() {
    assert_eq!(next_grade(1), 2);
    assert_eq!(next_grade(5), 6);
    assert_eq!(next_grade(6), 6);
}

#[test]
fn inactive_students_get_the_inactive_message() {
    let decision = evaluate(StudentStatus::Inactive, 3);
    assert!(!decision.puede_promocionar);
    assert_eq!(decision.mensaje, "student is not active in the system");
}

#[test]
fn final_grade_students_get_the_final_grade_message() {
    let decision = evaluate(StudentStatus::Active, 6);
    assert!(!decision.puede_promocionar);
    assert_eq!(decision.mensaje, "student is already in the final grade");
    assert_eq!(decision.grado_siguiente, 6);
}

#[test]
fn eligible_students_get_the_advancing_message() {
    let decision = evaluate(StudentStatus::Active, 4);
    assert!(decision.puede_promocionar);
    assert_eq!(
        decision.mensaje,
        "student meets the requirements to advance"
    );
    assert_eq!(decision.grado_siguiente, 5);
}

#[test]
fn evaluation_is_idempotent() {
    let first = evaluate(StudentStatus::Active, 2);
    let second = evaluate(StudentStatus::Active, 2);
    assert_eq!(first, second);
}
