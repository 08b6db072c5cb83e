//! Dialogue engine
//!
//! Walks a [`DialogueGraph`]: reveals each node's text one character per
//! tick, optionally runs the glitch decoration, then offers the choices.
//! The reveal ticker and the decoration loop each live in a single task slot,
//! so entering a node always replaces whatever the previous node started.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::graph::{ActionTag, ChoiceTarget, DialogueGraph, NodeId};
use super::DialogueError;
use crate::config::DialogueConfig;
use crate::events::{Epoch, SessionEvent};
use crate::messages::ChoiceView;
use crate::renderer::Renderer;
use crate::scheduler::{Scheduler, TaskSlot};

/// Characters the decoration draws from
pub const GLITCH_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%&*?";

/// Decoration shown before the first refresh
pub const GLITCH_PLACEHOLDER: &str = "????";

/// Progress through the current node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogueSession {
    /// Node being shown
    pub node: NodeId,
    /// Characters revealed so far
    pub reveal_progress: usize,
    /// Decoration loop running
    pub decoration_active: bool,
    /// Choice list shown and selectable
    pub choices_visible: bool,
    chars: Vec<char>,
    decorated: bool,
}

impl DialogueSession {
    /// Whether every character has been revealed
    #[must_use]
    pub fn fully_revealed(&self) -> bool {
        self.reveal_progress >= self.chars.len()
    }
}

/// Result of [`DialogueEngine::choose`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChoiceOutcome {
    /// Choices hidden, no session, or index out of range
    Ignored,
    /// Entered the next node
    Advanced(NodeId),
    /// Walk ended with an action for the session
    Terminal(ActionTag),
}

/// Runs the dialogue walk
pub struct DialogueEngine {
    graph: Arc<DialogueGraph>,
    config: DialogueConfig,
    renderer: Arc<dyn Renderer>,
    scheduler: Scheduler,
    session: Option<DialogueSession>,
    epoch: Epoch,
    reveal_task: TaskSlot,
    decoration_task: TaskSlot,
    rng: StdRng,
    finished: bool,
}

impl std::fmt::Debug for DialogueEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueEngine")
            .field("session", &self.session)
            .field("epoch", &self.epoch)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl DialogueEngine {
    /// Create an engine with no session yet
    #[must_use]
    pub fn new(
        graph: Arc<DialogueGraph>,
        config: DialogueConfig,
        renderer: Arc<dyn Renderer>,
        scheduler: Scheduler,
    ) -> Self {
        Self::with_rng(graph, config, renderer, scheduler, StdRng::from_entropy())
    }

    /// Create an engine with an explicit random source for the decoration
    #[must_use]
    pub fn with_rng(
        graph: Arc<DialogueGraph>,
        config: DialogueConfig,
        renderer: Arc<dyn Renderer>,
        scheduler: Scheduler,
        rng: StdRng,
    ) -> Self {
        Self {
            graph,
            config,
            renderer,
            scheduler,
            session: None,
            epoch: 0,
            reveal_task: TaskSlot::new(),
            decoration_task: TaskSlot::new(),
            rng,
            finished: false,
        }
    }

    /// Enter `id`: clear the area and start revealing its text
    ///
    /// # Errors
    ///
    /// [`DialogueError::NotFound`] if `id` is not in the graph. The current
    /// node is left untouched in that case.
    pub fn enter(&mut self, id: NodeId) -> Result<(), DialogueError> {
        let node = self.graph.lookup(id)?;
        let chars: Vec<char> = node.text.chars().collect();
        let decorated = node.decorated;
        let critical = node.critical;

        self.stop();
        self.finished = false;

        self.renderer.clear_dialogue();
        if critical {
            self.renderer.raise_critical_alert();
        }
        tracing::debug!(node = %id, chars = chars.len(), decorated, critical, "Entering dialogue node");

        let empty = chars.is_empty();
        self.session = Some(DialogueSession {
            node: id,
            reveal_progress: 0,
            decoration_active: false,
            choices_visible: false,
            chars,
            decorated,
        });

        if empty {
            self.finish_reveal();
        } else {
            self.reveal_task.replace(self.scheduler.every(
                self.config.type_speed,
                SessionEvent::RevealTick { epoch: self.epoch },
            ));
        }
        Ok(())
    }

    /// Reveal ticker callback
    pub fn on_reveal_tick(&mut self, epoch: Epoch) {
        if epoch != self.epoch {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Some(&ch) = session.chars.get(session.reveal_progress) {
            session.reveal_progress += 1;
            self.renderer.reveal_text(ch);
        }
        if session.fully_revealed() {
            self.finish_reveal();
        }
    }

    fn finish_reveal(&mut self) {
        self.reveal_task.cancel();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if session.decorated {
            session.decoration_active = true;
            self.renderer
                .set_decoration_text(GLITCH_PLACEHOLDER.to_string());
            self.decoration_task.replace(self.scheduler.every(
                self.config.decoration_interval,
                SessionEvent::DecorationTick { epoch: self.epoch },
            ));
        }

        let node_id = session.node;
        let choices: Vec<ChoiceView> = match self.graph.lookup(node_id) {
            Ok(node) => node
                .choices
                .iter()
                .map(|c| ChoiceView {
                    label: c.label.clone(),
                    style: c.style.clone(),
                })
                .collect(),
            Err(_) => Vec::new(),
        };

        if choices.is_empty() {
            self.finished = true;
            tracing::info!(node = %node_id, "Dialogue walk ended at a node without choices");
            return;
        }
        session.choices_visible = true;
        self.renderer
            .show_choices(choices, self.config.choice_fade_in);
    }

    /// Decoration loop callback
    pub fn on_decoration_tick(&mut self, epoch: Epoch) {
        if epoch != self.epoch {
            return;
        }
        if !self.session.as_ref().is_some_and(|s| s.decoration_active) {
            return;
        }
        let text: String = (0..self.config.decoration_len)
            .map(|_| char::from(GLITCH_CHARSET[self.rng.gen_range(0..GLITCH_CHARSET.len())]))
            .collect();
        self.renderer.set_decoration_text(text);
    }

    /// Pick choice `index` of the current node
    ///
    /// Ignored until the choice list is visible.
    ///
    /// # Errors
    ///
    /// [`DialogueError::NotFound`] if the chosen `next` does not resolve,
    /// which a validated graph prevents.
    pub fn choose(&mut self, index: usize) -> Result<ChoiceOutcome, DialogueError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(ChoiceOutcome::Ignored);
        };
        if !session.choices_visible {
            tracing::debug!(index, "Choice ignored, choices not visible yet");
            return Ok(ChoiceOutcome::Ignored);
        }
        let node_id = session.node;
        let node = self.graph.lookup(node_id)?;
        let Some(target) = node.choices.get(index).map(|c| c.target) else {
            tracing::debug!(index, "Choice ignored, no such choice");
            return Ok(ChoiceOutcome::Ignored);
        };

        match target {
            ChoiceTarget::Next(next) => {
                self.enter(next)?;
                Ok(ChoiceOutcome::Advanced(next))
            }
            ChoiceTarget::Terminal(action) => {
                tracing::info!(node = %node_id, ?action, "Terminal choice taken");
                self.stop();
                self.finished = true;
                if let Some(session) = self.session.as_mut() {
                    session.choices_visible = false;
                }
                Ok(ChoiceOutcome::Terminal(action))
            }
        }
    }

    /// Cancel the reveal ticker and decoration loop
    pub fn stop(&mut self) {
        self.reveal_task.cancel();
        self.decoration_task.cancel();
        self.epoch += 1;
        if let Some(session) = self.session.as_mut() {
            session.decoration_active = false;
        }
    }

    /// Current session, once the dialogue has begun
    #[must_use]
    pub fn session(&self) -> Option<&DialogueSession> {
        self.session.as_ref()
    }

    /// Whether the walk has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Epoch stamped on ticker events
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Whether the reveal ticker is running
    #[must_use]
    pub fn revealing(&self) -> bool {
        self.reveal_task.is_active()
    }

    /// Whether the decoration loop is running
    #[must_use]
    pub fn decorating(&self) -> bool {
        self.decoration_task.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::graph::{Choice, DialogueNode};
    use crate::messages::RenderDirective;
    use crate::renderer::RecordingRenderer;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    struct Harness {
        engine: DialogueEngine,
        recorder: Arc<RecordingRenderer>,
        inbox: mpsc::UnboundedReceiver<SessionEvent>,
    }

    fn harness(graph: DialogueGraph) -> Harness {
        let recorder = Arc::new(RecordingRenderer::new());
        let (scheduler, inbox) = Scheduler::channel();
        let engine = DialogueEngine::with_rng(
            Arc::new(graph),
            DialogueConfig::default(),
            recorder.clone(),
            scheduler,
            StdRng::seed_from_u64(42),
        );
        Harness {
            engine,
            recorder,
            inbox,
        }
    }

    fn reveal_all(engine: &mut DialogueEngine) {
        let epoch = engine.epoch();
        for _ in 0..1_000 {
            if engine.session().is_some_and(DialogueSession::fully_revealed) {
                return;
            }
            engine.on_reveal_tick(epoch);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_unknown_node() {
        let mut h = harness(DialogueGraph::builtin().unwrap());
        assert!(matches!(
            h.engine.enter(NodeId::Index(42)),
            Err(DialogueError::NotFound(NodeId::Index(42)))
        ));
        assert!(h.engine.session().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_then_choices() {
        let mut h = harness(DialogueGraph::builtin().unwrap());
        h.engine.enter(NodeId::Entry).unwrap();
        assert!(h.engine.revealing());
        assert_eq!(h.recorder.snapshot()[0], RenderDirective::ClearDialogue);

        reveal_all(&mut h.engine);

        assert_eq!(h.recorder.revealed_text(), "Oichi... A desilusão da família Mori.");
        assert!(!h.engine.revealing());
        let session = h.engine.session().unwrap();
        assert!(session.choices_visible);
        assert!(!session.decoration_active);
        assert_eq!(
            h.recorder.last(),
            Some(RenderDirective::ShowChoices {
                choices: vec![
                    ChoiceView {
                        label: "Onde eu estou?".to_string(),
                        style: None
                    },
                    ChoiceView {
                        label: "Que lugar é este?".to_string(),
                        style: None
                    },
                ],
                fade_in: std::time::Duration::from_millis(500),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_choose_ignored_before_reveal_completes() {
        let mut h = harness(DialogueGraph::builtin().unwrap());
        h.engine.enter(NodeId::Entry).unwrap();
        let epoch = h.engine.epoch();
        h.engine.on_reveal_tick(epoch);

        assert_eq!(h.engine.choose(0).unwrap(), ChoiceOutcome::Ignored);
        assert_eq!(h.engine.session().unwrap().node, NodeId::Entry);
        assert_eq!(h.engine.session().unwrap().reveal_progress, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decoration_runs_after_reveal() {
        let mut h = harness(DialogueGraph::builtin().unwrap());
        h.engine.enter(NodeId::Index(5)).unwrap();
        reveal_all(&mut h.engine);

        assert!(h.engine.decorating());
        assert!(h.engine.session().unwrap().decoration_active);
        assert!(h
            .recorder
            .snapshot()
            .contains(&RenderDirective::SetDecorationText {
                text: GLITCH_PLACEHOLDER.to_string()
            }));

        let epoch = h.engine.epoch();
        h.recorder.take();
        h.engine.on_decoration_tick(epoch);
        match h.recorder.last() {
            Some(RenderDirective::SetDecorationText { text }) => {
                assert_eq!(text.chars().count(), 4);
                assert!(text.bytes().all(|b| GLITCH_CHARSET.contains(&b)));
            }
            other => panic!("expected decoration text, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reentry_cancels_decoration() {
        let mut h = harness(DialogueGraph::builtin().unwrap());
        h.engine.enter(NodeId::Index(5)).unwrap();
        reveal_all(&mut h.engine);
        let old_epoch = h.engine.epoch();

        assert_eq!(
            h.engine.choose(0).unwrap(),
            ChoiceOutcome::Advanced(NodeId::Index(6))
        );
        assert!(!h.engine.decorating());
        assert!(!h.engine.session().unwrap().decoration_active);

        // A tick queued before the cancel must not write anything
        h.recorder.take();
        h.engine.on_decoration_tick(old_epoch);
        h.engine.on_reveal_tick(old_epoch);
        assert!(h.recorder.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_enter_cancels_decoration() {
        let mut h = harness(DialogueGraph::builtin().unwrap());
        h.engine.enter(NodeId::Index(5)).unwrap();
        reveal_all(&mut h.engine);
        let old_epoch = h.engine.epoch();

        // Decoration is live before the jump
        h.recorder.take();
        h.engine.on_decoration_tick(old_epoch);
        assert_eq!(
            h.recorder
                .count(|d| matches!(d, RenderDirective::SetDecorationText { .. })),
            1
        );

        h.engine.enter(NodeId::Index(0)).unwrap();
        assert!(!h.engine.decorating());
        let session = h.engine.session().unwrap();
        assert_eq!(session.node, NodeId::Index(0));
        assert!(!session.decoration_active);
        assert_eq!(session.reveal_progress, 0);

        h.recorder.take();
        for _ in 0..5 {
            h.engine.on_decoration_tick(old_epoch);
        }
        assert!(h.recorder.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_critical_node_and_terminal_choice() {
        let mut h = harness(DialogueGraph::builtin().unwrap());
        h.engine.enter(NodeId::Index(6)).unwrap();
        assert_eq!(
            &h.recorder.snapshot()[..2],
            &[RenderDirective::ClearDialogue, RenderDirective::RaiseCriticalAlert]
        );
        reveal_all(&mut h.engine);

        assert_eq!(h.engine.choose(3).unwrap(), ChoiceOutcome::Ignored);
        assert_eq!(
            h.engine.choose(0).unwrap(),
            ChoiceOutcome::Terminal(ActionTag::Destroy)
        );
        assert!(h.engine.is_finished());
        assert_eq!(h.engine.choose(0).unwrap(), ChoiceOutcome::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_true_branching() {
        let graph = DialogueGraph::new(vec![
            DialogueNode::new(
                NodeId::Entry,
                "a",
                vec![
                    Choice::next("left", NodeId::Index(1)),
                    Choice::next("right", NodeId::Index(2)),
                ],
            ),
            DialogueNode::new(NodeId::Index(1), "l", vec![]),
            DialogueNode::new(NodeId::Index(2), "r", vec![]),
        ])
        .unwrap();
        let mut h = harness(graph);
        h.engine.enter(NodeId::Entry).unwrap();
        reveal_all(&mut h.engine);

        assert_eq!(
            h.engine.choose(1).unwrap(),
            ChoiceOutcome::Advanced(NodeId::Index(2))
        );
        reveal_all(&mut h.engine);
        // No choices: the walk simply ends
        assert!(h.engine.is_finished());
        assert!(!h.engine.session().unwrap().choices_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_driven_by_scheduler() {
        let mut h = harness(DialogueGraph::builtin().unwrap());
        h.engine.enter(NodeId::Index(0)).unwrap();
        let expected = "Você está no Santuário dos Mortos.";

        let start = tokio::time::Instant::now();
        while !h.engine.session().unwrap().fully_revealed() {
            match h.inbox.recv().await {
                Some(SessionEvent::RevealTick { epoch }) => h.engine.on_reveal_tick(epoch),
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(h.recorder.revealed_text(), expected);
        let chars = expected.chars().count() as u32;
        assert_eq!(start.elapsed(), std::time::Duration::from_millis(50) * chars);
    }
}
