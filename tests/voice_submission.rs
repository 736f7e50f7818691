use echocoach::dialogue::phrases::ENGLISH;
use echocoach::voice::{
    EngineEvent, ListeningState, MockRecognizer, RecognitionEvent, Segment, VoiceCapture,
};
use echocoach::{MockClock, MockCoach, Mode, Orchestrator, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const GUARD: Duration = Duration::from_millis(500);

fn result(index: usize, segments: &[(&str, bool)]) -> EngineEvent {
    EngineEvent::Result(RecognitionEvent {
        result_index: index,
        results: segments
            .iter()
            .map(|(text, is_final)| Segment {
                transcript: text.to_string(),
                is_final: *is_final,
            })
            .collect(),
    })
}

#[tokio::test]
async fn spoken_turn_reaches_orchestrator_and_late_fragment_is_dropped() {
    let engine = MockRecognizer::new();
    let clock = MockClock::new();
    let mut capture =
        VoiceCapture::with_clock(Box::new(engine.clone()), "en-US", GUARD, clock.clone());
    let coach = MockCoach::new().with_classification(Mode::SimulationSetup, "Let's set it up.");
    let orch = Orchestrator::new(Arc::new(coach), &ENGLISH);

    capture.start().unwrap();
    engine.emit(EngineEvent::Start);
    engine.emit(result(0, &[("I want to ", true), ("train", false)]));
    engine.emit(result(1, &[("I want to ", true), ("train for a cold call", true)]));
    assert_eq!(
        capture.pump().as_deref(),
        Some("I want to train for a cold call")
    );
    assert_eq!(capture.state(), ListeningState::Listening);

    let text = capture.submit(orch.is_busy()).unwrap();
    orch.submit_user_turn(&text).await;
    assert_eq!(capture.input(), "");
    assert_eq!(capture.state(), ListeningState::Idle);
    assert_eq!(engine.stops(), 1);

    // A fragment still in flight from the stopped session.
    clock.advance(Duration::from_millis(120));
    engine.emit(result(2, &[("call", false)]));
    assert_eq!(capture.pump(), None);
    assert_eq!(capture.input(), "");

    let user_turns: Vec<String> = orch
        .messages()
        .await
        .into_iter()
        .filter(|m| m.sender == Sender::User)
        .map(|m| m.text)
        .collect();
    assert_eq!(user_turns, vec!["I want to train for a cold call".to_string()]);
    assert_eq!(orch.mode().await, Mode::SimulationSetup);
}

#[test]
fn guard_expires_and_next_session_is_heard() {
    let engine = MockRecognizer::new();
    let clock = MockClock::new();
    let mut capture =
        VoiceCapture::with_clock(Box::new(engine.clone()), "fr-FR", GUARD, clock.clone());

    capture.set_input("typed answer");
    assert_eq!(capture.submit(false).as_deref(), Some("typed answer"));
    assert!(capture.is_send_guard_active());

    clock.advance(GUARD);
    assert!(!capture.is_send_guard_active());

    capture.start().unwrap();
    engine.emit(EngineEvent::Start);
    engine.emit(result(0, &[("suivant", false)]));
    assert_eq!(capture.pump().as_deref(), Some("suivant"));
    assert_eq!(engine.starts(), vec!["fr-FR".to_string()]);
}

#[test]
fn engine_end_returns_to_idle_but_keeps_transcript() {
    let engine = MockRecognizer::new();
    let mut capture =
        VoiceCapture::with_clock(Box::new(engine.clone()), "en-US", GUARD, MockClock::new());
    capture.start().unwrap();
    engine.emit(EngineEvent::Start);
    engine.emit(result(0, &[("hello there", true)]));
    engine.emit(EngineEvent::End);
    capture.pump();

    assert_eq!(capture.state(), ListeningState::Idle);
    assert_eq!(capture.input(), "hello there");
}

#[tokio::test]
async fn submission_during_in_flight_turn_keeps_input_until_turn_ends() {
    let gate = Arc::new(Semaphore::new(0));
    let coach = MockCoach::new()
        .with_classification(Mode::Debrief, "Tell me more.")
        .with_debrief("What would you change?")
        .with_gate(Arc::clone(&gate));
    let orch = Arc::new(Orchestrator::new(Arc::new(coach), &ENGLISH));
    let mut capture = VoiceCapture::with_clock(
        Box::new(MockRecognizer::new()),
        "en-US",
        GUARD,
        MockClock::new(),
    );

    // Two lines back to back: the first claims the turn before its task runs.
    capture.set_input("The call went badly");
    let (permit, text) = capture.submit_turn(&orch).unwrap();
    assert!(orch.is_busy());
    let first = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.run_turn(permit, &text).await }
    });

    capture.set_input("They hung up on me");
    assert!(capture.submit_turn(&orch).is_none());
    assert_eq!(capture.input(), "They hung up on me");
    assert!(!capture.is_send_guard_active());

    gate.add_permits(1);
    first.await.unwrap();

    let (permit, text) = capture.submit_turn(&orch).unwrap();
    assert_eq!(capture.input(), "");
    gate.add_permits(1);
    orch.run_turn(permit, &text).await;

    let user_turns: Vec<String> = orch
        .messages()
        .await
        .into_iter()
        .filter(|m| m.sender == Sender::User)
        .map(|m| m.text)
        .collect();
    assert_eq!(
        user_turns,
        vec![
            "The call went badly".to_string(),
            "They hung up on me".to_string()
        ]
    );
    assert!(!orch.is_busy());
}
