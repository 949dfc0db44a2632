use test_utils::jpeg_fixture;
use test_utils::png_fixture;

use super::ActiveView;
use crate::domain::models::DesignError;
use crate::domain::models::DesignHistoryItem;
use crate::domain::models::DesignSession;
use crate::domain::models::ImageState;
use crate::domain::models::Plant;

fn uploaded() -> ImageState {
    return ImageState::new(png_fixture(), "image/png");
}

fn generated() -> ImageState {
    return ImageState::new(jpeg_fixture(), "image/jpeg");
}

fn item(id: u64) -> DesignHistoryItem {
    return DesignHistoryItem {
        id,
        original_image: uploaded(),
        prompt: "add roses".to_string(),
        generated_image: generated(),
    };
}

#[test]
fn it_shows_fresh_uploads() {
    let mut view = ActiveView::default();
    view.error_message = Some("old".to_string());
    view.plants = vec![Plant::new("Fern")];
    view.show_upload(uploaded());

    assert_eq!(view.original_image, Some(uploaded()));
    assert_eq!(view.generated_image, None);
    assert!(view.plants.is_empty());
    assert_eq!(view.error_message, None);
}

#[test]
fn it_resumes_sessions_with_their_latest_design() {
    let mut view = ActiveView::default();
    let session = DesignSession::new(1, uploaded()).with_item(item(2));
    view.show_session(&session);

    assert_eq!(view.original_image, Some(uploaded()));
    assert_eq!(view.generated_image, Some(generated()));
    assert!(view.plants.is_empty());
}

#[test]
fn it_resumes_empty_sessions_without_a_design() {
    let mut view = ActiveView::default();
    view.show_session(&DesignSession::new(1, uploaded()));

    assert_eq!(view.original_image, Some(uploaded()));
    assert_eq!(view.generated_image, None);
}

#[test]
fn it_branches_from_past_designs() {
    let mut view = ActiveView::default();
    view.show_upload(uploaded());
    let token = view.begin_generation();
    view.apply_generated(token, generated());
    view.apply_plants(token, vec![Plant::new("Rose")]);

    view.show_branch(&item(2));

    assert_eq!(view.original_image, Some(generated()));
    assert_eq!(view.generated_image, None);
    assert!(view.plants.is_empty());
}

#[test]
fn it_resets_everything() {
    let mut view = ActiveView::default();
    view.show_upload(uploaded());
    view.show_error(&DesignError::NoImage);
    view.reset();

    assert_eq!(view.original_image, None);
    assert_eq!(view.error_message, None);
    assert!(!view.is_busy());
}

#[test]
fn it_tracks_flags_through_a_generation() {
    let mut view = ActiveView::default();
    view.show_upload(uploaded());

    let token = view.begin_generation();
    assert!(view.is_generating);
    assert!(view.is_identifying);

    assert!(view.apply_generated(token, generated()));
    assert!(view.is_generating);
    assert_eq!(view.generated_image, Some(generated()));

    assert!(view.apply_plants(token, vec![Plant::new("Rose")]));
    assert!(!view.is_busy());
    assert_eq!(view.plants, vec![Plant::new("Rose")]);
}

#[test]
fn it_clears_the_design_on_generation_failure() {
    let mut view = ActiveView::default();
    view.show_upload(uploaded());

    let token = view.begin_generation();
    let err = DesignError::Generation("boom".to_string());
    assert!(view.apply_generation_failure(token, &err));

    assert_eq!(view.generated_image, None);
    assert_eq!(view.error_message, Some("boom".to_string()));
    assert!(!view.is_busy());
}

#[test]
fn it_keeps_the_design_on_identification_failure() {
    let mut view = ActiveView::default();
    view.show_upload(uploaded());

    let token = view.begin_generation();
    view.apply_generated(token, generated());
    assert!(view.apply_identification_failure(token, &DesignError::identification()));

    assert_eq!(view.generated_image, Some(generated()));
    assert!(view.plants.is_empty());
    insta::assert_snapshot!(view.error_message.unwrap(), @"Could not identify plants, but here's your new garden!");
}

#[test]
fn it_discards_stale_completions() {
    let mut view = ActiveView::default();
    view.show_upload(uploaded());

    let first = view.begin_generation();
    let second = view.begin_generation();

    assert!(!view.is_current(first));
    assert!(!view.apply_generated(first, uploaded()));
    assert!(!view.apply_plants(first, vec![Plant::new("Weed")]));
    assert_eq!(view.generated_image, None);
    assert!(view.is_busy());

    assert!(view.apply_generated(second, generated()));
    assert!(view.apply_plants(second, vec![]));
    assert_eq!(view.generated_image, Some(generated()));
}

#[test]
fn it_invalidates_in_flight_work_when_the_view_changes() {
    let mut view = ActiveView::default();
    view.show_upload(uploaded());
    let token = view.begin_generation();

    view.reset();

    assert!(!view.is_busy());
    assert!(!view.apply_generated(token, generated()));
    assert_eq!(view.generated_image, None);
}
