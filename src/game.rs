//! Core game logic for a live quiz session
//!
//! This module contains the state machine of one session: the roster, the
//! lifecycle (waiting, active, review, finished), answer collection,
//! scoring at the end of each question, and the snapshot clients render
//! from. It is transport agnostic and performs no I/O; the session layer
//! drives it and broadcasts its snapshots.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tokio_util::sync::CancellationToken;

use super::{
    constants::participant::MAX_PLAYER_COUNT,
    game_id::SessionCode,
    names,
    quiz::{
        config::{ItemId, Question, Quiz},
        media::Media,
    },
    scoring,
    settings::Settings,
    watcher::ClientId,
};

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Lobby; participants may join
    #[default]
    Waiting,
    /// A question is open and its countdown is running
    Active,
    /// The question is closed and its answer revealed
    Review,
    /// Every question has been played
    Finished,
}

/// A member of the roster
#[derive(Debug, Clone)]
struct Participant {
    name: String,
    color: String,
    score: u64,
    /// Join sequence, used to keep roster order stable
    joined: u64,
}

/// The answer a participant currently has on record for the open question
#[derive(Debug, Clone)]
struct Answer {
    option_id: ItemId,
    time_remaining: u64,
}

/// Messages clients send, tagged by `action`
///
/// Which variants are honoured depends on the sender's role; see
/// [`crate::session::Session::handle`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomingMessage {
    /// Host: leave the lobby and open the first question
    StartGame,
    /// Host: open the next question, or finish after the last one
    NextQuestion,
    /// Host: end the current countdown early
    SkipTimer,
    /// Host: return to the lobby with scores cleared
    Reset,
    /// Participant: enter the roster
    Join {
        /// Requested display name
        #[serde(default)]
        name: Option<String>,
        /// Requested avatar color as a hex code
        #[serde(default)]
        color: Option<String>,
    },
    /// Participant: record or replace an answer for the open question
    #[serde(rename_all = "camelCase")]
    SubmitAnswer {
        /// The chosen option
        answer_id: ItemId,
    },
}

/// Messages the server pushes to every connection of a session, tagged by `type`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutgoingMessage {
    /// Full snapshot of the session
    StateUpdate {
        /// The session as it is now
        state: Box<Snapshot>,
    },
    /// Countdown progress of the open question
    #[serde(rename_all = "camelCase")]
    Tick {
        /// Seconds left on the countdown
        time_remaining: u64,
    },
}

impl OutgoingMessage {
    /// Wraps a snapshot in a state update
    pub fn state(snapshot: Snapshot) -> Self {
        Self::StateUpdate {
            state: Box::new(snapshot),
        }
    }

    /// Converts the message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// A roster entry as clients see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantView {
    /// Client identifier the participant connects with
    pub id: ClientId,
    /// Display name
    pub name: String,
    /// Avatar color
    pub color: String,
    /// Points collected so far
    pub score: u64,
}

/// An answer option as clients see it
///
/// `is_correct` is withheld while the question is open.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    /// Option identifier to submit
    pub id: ItemId,
    /// Option text
    pub text: String,
    /// Whether this is the right answer; only sent once the question is closed
    pub is_correct: Option<bool>,
}

/// The current question as clients see it
///
/// `explanation` is withheld while the question is open.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    /// Question identifier
    pub id: ItemId,
    /// Question text
    pub text: String,
    /// Length of the countdown in seconds
    pub time_limit: u64,
    /// The four answer options
    pub options: Vec<OptionView>,
    /// Attached media
    pub media: Option<Media>,
    /// Shown with the answer
    pub explanation: Option<String>,
}

impl QuestionView {
    fn new(question: &Question, reveal: bool) -> Self {
        Self {
            id: question.id.clone(),
            text: question.text.clone(),
            time_limit: question.time_limit(),
            options: question
                .options
                .iter()
                .map(|option| OptionView {
                    id: option.id.clone(),
                    text: option.text.clone(),
                    is_correct: reveal.then_some(option.is_correct),
                })
                .collect(),
            media: question.media.clone(),
            explanation: if reveal {
                question.explanation.clone()
            } else {
                None
            },
        }
    }
}

/// Everything a client needs to render the session
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Code of the session
    pub session_code: SessionCode,
    /// Lifecycle phase
    pub status: Status,
    /// Index of the question that is open, under review, or played last
    pub current_question_index: usize,
    /// Seconds left on the countdown; 0 outside an open question
    pub time_remaining: u64,
    /// The roster in join order
    pub participants: Vec<ParticipantView>,
    /// The current question, absent in the lobby and after the game
    pub current_question: Option<QuestionView>,
    /// Number of questions in the quiz
    pub total_questions: usize,
    /// Title of the quiz
    pub title: String,
    /// Settings the session was created with
    pub settings: Settings,
    /// Points each answering participant earned on the last closed question
    pub last_awards: BTreeMap<ClientId, u64>,
}

/// The state machine of one live session
pub struct Game {
    code: SessionCode,
    quiz: Quiz,
    settings: Settings,
    status: Status,
    current_question_index: usize,
    time_remaining: u64,
    participants: HashMap<ClientId, Participant>,
    /// Answers for the open question; cleared whenever a question opens
    answers: HashMap<ClientId, Answer>,
    last_awards: HashMap<ClientId, u64>,
    /// Cancels the countdown of the open question
    timer: Option<CancellationToken>,
    joined: u64,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("code", &self.code)
            .field("status", &self.status)
            .field("current_question_index", &self.current_question_index)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Creates a session in the lobby
    ///
    /// Questions without their own time limit inherit the quiz default, or
    /// failing that the settings' default timer.
    pub fn new(code: SessionCode, quiz: Quiz, settings: Settings) -> Self {
        let quiz = quiz.with_resolved_time_limits(settings.default_timer_seconds);
        Self {
            code,
            quiz,
            settings,
            status: Status::Waiting,
            current_question_index: 0,
            time_remaining: 0,
            participants: HashMap::new(),
            answers: HashMap::new(),
            last_awards: HashMap::new(),
            timer: None,
            joined: 0,
        }
    }

    /// Code of the session this game belongs to
    pub fn code(&self) -> SessionCode {
        self.code
    }

    /// Current lifecycle phase
    pub fn status(&self) -> Status {
        self.status
    }

    /// Seconds left on the countdown
    pub fn time_remaining(&self) -> u64 {
        self.time_remaining
    }

    /// Index of the current question
    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    /// Settings of the session
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of participants on the roster
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Score of `client_id`, if on the roster
    pub fn score(&self, client_id: &ClientId) -> Option<u64> {
        self.participants.get(client_id).map(|p| p.score)
    }

    fn current_question(&self) -> Option<&Question> {
        self.quiz.question(self.current_question_index)
    }

    /// Leaves the lobby and opens the first question
    ///
    /// Returns the token of the new countdown, or `None` if the game was not
    /// waiting. A quiz without questions finishes immediately.
    pub fn start_game(&mut self) -> Option<CancellationToken> {
        if self.status != Status::Waiting {
            return None;
        }

        self.current_question_index = 0;
        self.answers.clear();
        self.last_awards.clear();

        if self.quiz.is_empty() {
            info!("{}: started with no questions, finishing", self.code);
            self.status = Status::Finished;
            return None;
        }

        info!("{}: game started", self.code);
        self.status = Status::Active;
        Some(self.start_question_timer())
    }

    /// Opens the next question, or finishes after the last one
    ///
    /// Valid from review. A question whose countdown was skipped but has not
    /// yet expired is closed and scored first. Returns the token of the new
    /// countdown when a question opened.
    pub fn next_question(&mut self) -> Option<CancellationToken> {
        match self.status {
            Status::Review => {}
            Status::Active if self.time_remaining == 0 => {
                self.finish_question();
            }
            Status::Waiting | Status::Active | Status::Finished => return None,
        }

        if self.current_question_index + 1 >= self.quiz.len() {
            info!("{}: game finished", self.code);
            self.stop_timer();
            self.status = Status::Finished;
            return None;
        }

        self.current_question_index += 1;
        self.answers.clear();
        self.last_awards.clear();
        self.status = Status::Active;
        debug!(
            "{}: opened question {}",
            self.code, self.current_question_index
        );
        Some(self.start_question_timer())
    }

    /// Records `option_id` as the answer of `client_id`, replacing any earlier one
    ///
    /// Ignored unless a question is open and the sender is on the roster.
    pub fn submit_answer(&mut self, client_id: &ClientId, option_id: ItemId) -> bool {
        if self.status != Status::Active || !self.participants.contains_key(client_id) {
            return false;
        }

        self.answers.insert(
            client_id.clone(),
            Answer {
                option_id,
                time_remaining: self.time_remaining,
            },
        );
        true
    }

    /// Zeroes the countdown; the question closes on the timer's next tick
    pub fn skip_timer(&mut self) -> bool {
        if self.status != Status::Active {
            return false;
        }
        self.time_remaining = 0;
        true
    }

    /// Returns to the lobby, keeping the roster but clearing all progress
    pub fn reset_game(&mut self) {
        info!("{}: game reset", self.code);
        self.stop_timer();
        self.status = Status::Waiting;
        self.current_question_index = 0;
        self.time_remaining = 0;
        self.answers.clear();
        self.last_awards.clear();
        for participant in self.participants.values_mut() {
            participant.score = 0;
        }
    }

    /// Adds `client_id` to the roster
    ///
    /// Joining again with the same identifier keeps the existing entry. The
    /// name and color are cleaned first; a join without a usable name is
    /// ignored when the settings require one, and so is any join once the
    /// roster is full.
    pub fn add_participant(
        &mut self,
        client_id: &ClientId,
        name: Option<&str>,
        color: Option<&str>,
    ) -> bool {
        if self.participants.contains_key(client_id) {
            return false;
        }
        if self.participants.len() >= MAX_PLAYER_COUNT {
            debug!("{}: roster full, ignoring {client_id}", self.code);
            return false;
        }
        let Some(name) = names::resolve_name(name, self.settings.require_player_names) else {
            debug!("{}: {client_id} joined without a name", self.code);
            return false;
        };

        self.joined += 1;
        self.participants.insert(
            client_id.clone(),
            Participant {
                name,
                color: names::resolve_color(color),
                score: 0,
                joined: self.joined,
            },
        );
        true
    }

    /// Removes `client_id` from the roster along with its pending answer
    pub fn remove_participant(&mut self, client_id: &ClientId) -> bool {
        self.answers.remove(client_id);
        self.participants.remove(client_id).is_some()
    }

    /// Drops every participant not in `connected`, returning how many were removed
    pub fn prune_participants(&mut self, connected: &[ClientId]) -> usize {
        let before = self.participants.len();
        self.participants
            .retain(|client_id, _| connected.contains(client_id));
        self.answers
            .retain(|client_id, _| self.participants.contains_key(client_id));
        before - self.participants.len()
    }

    /// Loads the countdown of the current question and returns its token
    ///
    /// The previous countdown, if any, is cancelled before the new one exists.
    pub fn start_question_timer(&mut self) -> CancellationToken {
        self.stop_timer();
        self.time_remaining = self.current_question().map_or(0, Question::time_limit);
        let token = CancellationToken::new();
        self.timer = Some(token.clone());
        token
    }

    /// Cancels the running countdown, if any
    pub fn stop_timer(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }

    /// Advances the countdown by one second
    ///
    /// Returns the remaining time, or `None` if no question is open.
    pub fn tick(&mut self) -> Option<u64> {
        if self.status != Status::Active {
            return None;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        Some(self.time_remaining)
    }

    /// Closes the open question and scores every recorded answer
    pub fn finish_question(&mut self) -> bool {
        if self.status != Status::Active {
            return false;
        }
        self.stop_timer();
        self.status = Status::Review;
        self.time_remaining = 0;

        let Some(question) = self.quiz.question(self.current_question_index) else {
            return true;
        };

        self.last_awards.clear();
        for (client_id, answer) in self.answers.drain() {
            let Some(participant) = self.participants.get_mut(&client_id) else {
                continue;
            };
            let points = scoring::score(
                self.settings.points_system,
                question,
                question.is_correct(&answer.option_id),
                answer.time_remaining,
            );
            participant.score = participant.score.saturating_add(points);
            self.last_awards.insert(client_id, points);
        }

        info!(
            "{}: closed question {} with {} answers",
            self.code,
            self.current_question_index,
            self.last_awards.len()
        );
        true
    }

    /// Builds the snapshot broadcast to clients
    pub fn state(&self) -> Snapshot {
        let reveal = self.status != Status::Active;
        let last_awards = match self.status {
            Status::Review | Status::Finished => self
                .last_awards
                .iter()
                .map(|(client_id, points)| (client_id.clone(), *points))
                .collect(),
            Status::Waiting | Status::Active => BTreeMap::new(),
        };

        Snapshot {
            session_code: self.code,
            status: self.status,
            current_question_index: self.current_question_index,
            time_remaining: self.time_remaining,
            participants: self
                .participants
                .iter()
                .sorted_by_key(|(_, participant)| participant.joined)
                .map(|(client_id, participant)| ParticipantView {
                    id: client_id.clone(),
                    name: participant.name.clone(),
                    color: participant.color.clone(),
                    score: participant.score,
                })
                .collect(),
            current_question: self
                .current_question()
                .map(|question| QuestionView::new(question, reveal)),
            total_questions: self.quiz.len(),
            title: self.quiz.title.clone(),
            settings: self.settings.clone(),
            last_awards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        quiz::config::AnswerOption,
        settings::PointsSystem,
    };
    use std::str::FromStr;

    fn create_test_question(id: &str, time_limit: u64) -> Question {
        Question {
            id: id.into(),
            text: format!("Question {id}"),
            time_limit: Some(time_limit),
            points: 1000,
            media: None,
            explanation: Some("Because".to_string()),
            options: ["a", "b", "c", "d"]
                .into_iter()
                .map(|option| AnswerOption {
                    id: option.into(),
                    text: option.to_uppercase(),
                    is_correct: option == "a",
                })
                .collect(),
        }
    }

    fn create_test_game(questions: usize, settings: Settings) -> Game {
        let quiz = Quiz {
            title: "Test Quiz".to_string(),
            default_time_limit: None,
            questions: (0..questions)
                .map(|i| create_test_question(&format!("q{i}"), 30))
                .collect(),
        };
        Game::new(SessionCode::from_str("ABCD").unwrap(), quiz, settings)
    }

    fn join(game: &mut Game, id: &str) -> ClientId {
        let client_id = ClientId::from(id);
        assert!(game.add_participant(&client_id, Some(id), Some("#EF4444")));
        client_id
    }

    #[test]
    fn test_new_game_is_waiting() {
        let game = create_test_game(2, Settings::default());
        let state = game.state();
        assert_eq!(state.status, Status::Waiting);
        assert_eq!(state.current_question_index, 0);
        assert_eq!(state.total_questions, 2);
        assert!(state.participants.is_empty());
        assert!(state.last_awards.is_empty());
    }

    #[test]
    fn test_default_timer_fills_missing_limits() {
        let mut quiz = create_test_game(1, Settings::default()).quiz;
        quiz.questions[0].time_limit = None;
        let settings = Settings {
            default_timer_seconds: 12,
            ..Settings::default()
        };
        let mut game = Game::new(SessionCode::from_str("ABCD").unwrap(), quiz, settings);
        game.start_game();
        assert_eq!(game.time_remaining(), 12);
    }

    #[test]
    fn test_start_game() {
        let mut game = create_test_game(2, Settings::default());
        let token = game.start_game().unwrap();
        assert!(!token.is_cancelled());
        assert_eq!(game.status(), Status::Active);
        assert_eq!(game.time_remaining(), 30);

        // Only valid from the lobby
        assert!(game.start_game().is_none());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_start_empty_quiz_finishes() {
        let mut game = create_test_game(0, Settings::default());
        assert!(game.start_game().is_none());
        assert_eq!(game.status(), Status::Finished);
        assert!(game.state().current_question.is_none());
    }

    #[test]
    fn test_join_is_idempotent() {
        let mut game = create_test_game(1, Settings::default());
        let p1 = join(&mut game, "Ada");
        assert!(!game.add_participant(&p1, Some("Someone Else"), None));
        assert_eq!(game.participant_count(), 1);
        assert_eq!(game.state().participants[0].name, "Ada");
    }

    #[test]
    fn test_join_defaults() {
        let mut game = create_test_game(1, Settings::default());
        assert!(game.add_participant(&"p1".into(), None, None));
        let participant = &game.state().participants[0];
        assert_eq!(participant.name, "Anonymous");
        assert_eq!(participant.color, "#000000");
        assert_eq!(participant.score, 0);
    }

    #[test]
    fn test_join_requires_name_when_configured() {
        let settings = Settings {
            require_player_names: true,
            ..Settings::default()
        };
        let mut game = create_test_game(1, settings);
        assert!(!game.add_participant(&"p1".into(), None, None));
        assert!(!game.add_participant(&"p1".into(), Some("   "), None));
        assert!(game.add_participant(&"p1".into(), Some("Grace"), None));
    }

    #[test]
    fn test_join_allowed_mid_game() {
        let mut game = create_test_game(2, Settings::default());
        game.start_game();
        join(&mut game, "late");
        assert_eq!(game.participant_count(), 1);
    }

    #[test]
    fn test_roster_keeps_join_order() {
        let mut game = create_test_game(1, Settings::default());
        for id in ["zed", "amy", "mo"] {
            join(&mut game, id);
        }
        let ids = game
            .state()
            .participants
            .into_iter()
            .map(|p| p.id.to_string())
            .collect_vec();
        assert_eq!(ids, vec!["zed", "amy", "mo"]);
    }

    #[test]
    fn test_submit_answer_only_while_active() {
        let mut game = create_test_game(2, Settings::default());
        let p1 = join(&mut game, "p1");
        assert!(!game.submit_answer(&p1, "a".into()));

        game.start_game();
        assert!(game.submit_answer(&p1, "a".into()));
        // Unknown senders are ignored
        assert!(!game.submit_answer(&"ghost".into(), "a".into()));

        game.finish_question();
        assert!(!game.submit_answer(&p1, "a".into()));
    }

    #[test]
    fn test_last_answer_wins() {
        let mut game = create_test_game(1, Settings::default());
        let p1 = join(&mut game, "p1");
        game.start_game();
        game.submit_answer(&p1, "a".into());
        for _ in 0..10 {
            game.tick();
        }
        game.submit_answer(&p1, "b".into());
        game.finish_question();

        assert_eq!(game.score(&p1), Some(0));
        assert_eq!(game.state().last_awards.get(&p1), Some(&0));
    }

    #[test]
    fn test_answer_time_is_captured_at_submission() {
        let mut game = create_test_game(1, Settings::default());
        let p1 = join(&mut game, "p1");
        game.start_game();
        for _ in 0..15 {
            game.tick();
        }
        game.submit_answer(&p1, "a".into());
        for _ in 0..15 {
            game.tick();
        }
        game.finish_question();
        assert_eq!(game.score(&p1), Some(1250));
    }

    #[test]
    fn test_scoring_modes() {
        for (points_system, expected) in [
            (PointsSystem::Standard, 1500),
            (PointsSystem::Simple, 1),
            (PointsSystem::NoPoints, 0),
        ] {
            let settings = Settings {
                points_system,
                ..Settings::default()
            };
            let mut game = create_test_game(1, settings);
            let p1 = join(&mut game, "p1");
            game.start_game();
            game.submit_answer(&p1, "a".into());
            game.finish_question();
            assert_eq!(game.score(&p1), Some(expected), "{points_system:?}");
        }
    }

    #[test]
    fn test_non_answering_participants_get_no_award() {
        let mut game = create_test_game(1, Settings::default());
        let p1 = join(&mut game, "p1");
        let p2 = join(&mut game, "p2");
        game.start_game();
        game.submit_answer(&p1, "c".into());
        game.finish_question();

        let state = game.state();
        assert_eq!(state.last_awards.get(&p1), Some(&0));
        assert!(!state.last_awards.contains_key(&p2));
    }

    #[test]
    fn test_tick_and_finish() {
        let mut game = create_test_game(1, Settings::default());
        game.start_game();
        assert_eq!(game.tick(), Some(29));
        assert!(game.finish_question());
        assert_eq!(game.status(), Status::Review);
        assert_eq!(game.tick(), None);
        assert!(!game.finish_question());
    }

    #[test]
    fn test_skip_timer() {
        let mut game = create_test_game(1, Settings::default());
        assert!(!game.skip_timer());
        game.start_game();
        assert!(game.skip_timer());
        assert_eq!(game.time_remaining(), 0);
        assert_eq!(game.status(), Status::Active);
        assert_eq!(game.tick(), Some(0));
    }

    #[test]
    fn test_next_question_from_review() {
        let mut game = create_test_game(2, Settings::default());
        let p1 = join(&mut game, "p1");
        let first = game.start_game().unwrap();
        game.submit_answer(&p1, "a".into());
        game.finish_question();
        assert!(first.is_cancelled());

        let second = game.next_question().unwrap();
        assert!(!second.is_cancelled());
        assert_eq!(game.status(), Status::Active);
        assert_eq!(game.current_question_index(), 1);
        assert_eq!(game.time_remaining(), 30);
        // Awards of the previous question are not shown once the next opens
        assert!(game.state().last_awards.is_empty());
    }

    #[test]
    fn test_next_question_ignored_while_counting_down() {
        let mut game = create_test_game(2, Settings::default());
        let token = game.start_game().unwrap();
        assert!(game.next_question().is_none());
        assert_eq!(game.current_question_index(), 0);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_next_question_after_skip_scores_first() {
        let mut game = create_test_game(2, Settings::default());
        let p1 = join(&mut game, "p1");
        let first = game.start_game().unwrap();
        game.submit_answer(&p1, "a".into());
        game.skip_timer();

        assert!(game.next_question().is_some());
        assert!(first.is_cancelled());
        assert_eq!(game.current_question_index(), 1);
        assert_eq!(game.score(&p1), Some(1500));
    }

    #[test]
    fn test_next_question_on_last_finishes() {
        let mut game = create_test_game(2, Settings::default());
        let p1 = join(&mut game, "p1");
        game.start_game();
        game.finish_question();
        game.next_question();
        game.submit_answer(&p1, "a".into());
        game.finish_question();

        assert!(game.next_question().is_none());
        assert_eq!(game.status(), Status::Finished);
        assert_eq!(game.current_question_index(), 1);
        assert_eq!(game.state().last_awards.get(&p1), Some(&1500));

        assert!(game.next_question().is_none());
        assert_eq!(game.status(), Status::Finished);
    }

    #[test]
    fn test_reset_game() {
        let mut game = create_test_game(2, Settings::default());
        let p1 = join(&mut game, "p1");
        game.start_game();
        game.submit_answer(&p1, "a".into());
        game.finish_question();
        let token = game.next_question().unwrap();

        game.reset_game();
        assert!(token.is_cancelled());
        assert_eq!(game.status(), Status::Waiting);
        assert_eq!(game.current_question_index(), 0);
        assert_eq!(game.time_remaining(), 0);
        assert_eq!(game.score(&p1), Some(0));
        assert!(game.state().last_awards.is_empty());

        // The game can be played again
        assert!(game.start_game().is_some());
    }

    #[test]
    fn test_prune_participants() {
        let mut game = create_test_game(1, Settings::default());
        let p1 = join(&mut game, "p1");
        join(&mut game, "p2");
        join(&mut game, "p3");

        assert_eq!(game.prune_participants(&[p1.clone()]), 2);
        assert_eq!(game.participant_count(), 1);
        assert!(game.score(&p1).is_some());
    }

    #[test]
    fn test_remove_participant_drops_answer() {
        let mut game = create_test_game(1, Settings::default());
        let p1 = join(&mut game, "p1");
        game.start_game();
        game.submit_answer(&p1, "a".into());
        assert!(game.remove_participant(&p1));
        assert!(!game.remove_participant(&p1));
        game.finish_question();
        assert!(game.state().last_awards.is_empty());
    }

    #[test]
    fn test_restarting_timer_cancels_previous() {
        let mut game = create_test_game(1, Settings::default());
        let first = game.start_game().unwrap();
        let second = game.start_question_timer();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_snapshot_hides_answer_while_active() {
        let mut game = create_test_game(1, Settings::default());
        game.start_game();

        let value = serde_json::to_value(game.state()).unwrap();
        let question = &value["currentQuestion"];
        assert_eq!(question["text"], "Question q0");
        assert_eq!(question["timeLimit"], 30);
        assert!(question.get("explanation").is_none());
        for option in question["options"].as_array().unwrap() {
            assert!(option.get("isCorrect").is_none());
        }

        game.finish_question();
        let value = serde_json::to_value(game.state()).unwrap();
        let question = &value["currentQuestion"];
        assert_eq!(question["explanation"], "Because");
        assert_eq!(question["options"][0]["isCorrect"], true);
        assert_eq!(question["options"][1]["isCorrect"], false);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let mut game = create_test_game(3, Settings::default());
        join(&mut game, "p1");
        let value = serde_json::to_value(game.state()).unwrap();

        assert_eq!(value["sessionCode"], "ABCD");
        assert_eq!(value["status"], "WAITING");
        assert_eq!(value["currentQuestionIndex"], 0);
        assert_eq!(value["timeRemaining"], 0);
        assert_eq!(value["totalQuestions"], 3);
        assert_eq!(value["title"], "Test Quiz");
        assert_eq!(value["settings"]["pointsSystem"], "standard");
        assert_eq!(value["participants"][0]["id"], "p1");
        assert_eq!(value["participants"][0]["color"], "#EF4444");
        assert_eq!(value["participants"][0]["score"], 0);
    }

    #[test]
    fn test_incoming_message_parsing() {
        let message: IncomingMessage =
            serde_json::from_str(r##"{"action": "JOIN", "name": "Ada", "color": "#fff"}"##).unwrap();
        assert!(matches!(
            message,
            IncomingMessage::Join { name: Some(ref name), color: Some(_) } if name == "Ada"
        ));

        let message: IncomingMessage =
            serde_json::from_str(r#"{"action": "JOIN"}"#).unwrap();
        assert!(matches!(message, IncomingMessage::Join { name: None, color: None }));

        let message: IncomingMessage =
            serde_json::from_str(r#"{"action": "SUBMIT_ANSWER", "answerId": 3}"#).unwrap();
        assert!(matches!(message, IncomingMessage::SubmitAnswer { ref answer_id } if answer_id.as_str() == "3"));

        for action in ["START_GAME", "NEXT_QUESTION", "SKIP_TIMER", "RESET"] {
            let json = format!(r#"{{"action": "{action}"}}"#);
            assert!(serde_json::from_str::<IncomingMessage>(&json).is_ok());
        }

        assert!(serde_json::from_str::<IncomingMessage>(r#"{"action": "EXPLODE"}"#).is_err());
        assert!(serde_json::from_str::<IncomingMessage>(r#"{"name": "Ada"}"#).is_err());
    }

    #[test]
    fn test_outgoing_message_format() {
        let tick: serde_json::Value =
            serde_json::from_str(&OutgoingMessage::Tick { time_remaining: 5 }.to_message()).unwrap();
        assert_eq!(tick, serde_json::json!({"type": "TICK", "timeRemaining": 5}));

        let game = create_test_game(1, Settings::default());
        let update: serde_json::Value =
            serde_json::from_str(&OutgoingMessage::state(game.state()).to_message()).unwrap();
        assert_eq!(update["type"], "STATE_UPDATE");
        assert_eq!(update["state"]["status"], "WAITING");
    }
}
