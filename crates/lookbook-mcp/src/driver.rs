//! Submission state machine and the view state it drives.
//!
//! ```text
//! Idle ──submit──▶ Negotiating ──token──▶ Invoking ──body──▶ Interpreting ──list──▶ Ready
//!   ▲                   │                    │                     │
//!   │                   └────────────────────┴─────────────────────┴──────▶ Failed
//!   └──────────────────────────── select_image ──────────────────────────────┘
//! ```
//!
//! `submit` takes `&mut self`, so a driver can have at most one submission
//! in flight. Callers wanting several concurrent submissions need several
//! drivers.

use std::fmt;

use crate::client::McpClient;
use crate::encoder::UploadedImage;
use crate::error::{McpError, Result};
use crate::interpreter;
use crate::recommendation::RecommendationItem;

/// Where a submission currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriverState {
    /// Nothing submitted since the last image selection.
    #[default]
    Idle,
    /// Initialize handshake in flight.
    Negotiating,
    /// Tool call in flight.
    Invoking,
    /// Reading the tool's reply.
    Interpreting,
    /// Results are final.
    Ready,
    /// The submission failed; only a new selection leaves this state.
    Failed,
}

impl DriverState {
    /// Whether a submission is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Negotiating | Self::Invoking | Self::Interpreting)
    }

    /// Whether `next` is a legal transition from this state.
    ///
    /// Resetting to `Idle` is not a transition; it happens only through
    /// [`RecommendationDriver::select_image`].
    pub fn can_advance_to(self, next: DriverState) -> bool {
        use DriverState::*;
        match (self, next) {
            (Idle | Ready, Negotiating) => true,
            (Negotiating, Invoking) => true,
            (Invoking, Interpreting) => true,
            (Interpreting, Ready) => true,
            (Failed, _) => false,
            (_, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Negotiating => "negotiating",
            Self::Invoking => "invoking",
            Self::Interpreting => "interpreting",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Everything a front end needs to render, in one consistent snapshot.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    image: Option<UploadedImage>,
    state: DriverState,
    recommendations: Vec<RecommendationItem>,
    error: Option<String>,
}

impl ViewState {
    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Current list; during a stream this is the latest fragment's list.
    pub fn recommendations(&self) -> &[RecommendationItem] {
        &self.recommendations
    }

    /// Human-readable message of the last fatal failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Derived from the state, never stored separately.
    pub fn is_loading(&self) -> bool {
        self.state.is_busy()
    }

    /// Whether `submit` would start a submission.
    pub fn can_submit(&self) -> bool {
        self.image.is_some() && matches!(self.state, DriverState::Idle | DriverState::Ready)
    }
}

/// Runs submissions against one client and owns the resulting view state.
pub struct RecommendationDriver {
    client: McpClient,
    view: ViewState,
}

impl RecommendationDriver {
    pub fn new(client: McpClient) -> Self {
        Self {
            client,
            view: ViewState::default(),
        }
    }

    pub fn client(&self) -> &McpClient {
        &self.client
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Select a new image. Resets to `Idle` and clears results and error.
    pub fn select_image(&mut self, image: UploadedImage) {
        tracing::debug!(image = %image.name(), bytes = image.len(), "image selected");
        self.view = ViewState {
            image: Some(image),
            ..ViewState::default()
        };
    }

    /// Run one submission for the selected image.
    pub async fn submit(&mut self) -> Result<&[RecommendationItem]> {
        self.submit_with(|_| {}).await
    }

    /// Run one submission, calling `observer` with the view each time the
    /// visible list changes (once per list-bearing stream fragment).
    pub async fn submit_with<F>(&mut self, mut observer: F) -> Result<&[RecommendationItem]>
    where
        F: FnMut(&ViewState),
    {
        if self.view.state == DriverState::Failed {
            return Err(McpError::InvalidState(
                "previous submission failed; select an image to start over".to_string(),
            ));
        }

        // The view keeps its own copy so it stays complete mid-flight.
        let Some(image) = self.view.image.clone() else {
            let err = McpError::NoImage;
            self.fail(&err);
            return Err(err);
        };

        self.view.recommendations.clear();
        self.view.error = None;
        self.advance(DriverState::Negotiating);

        match self.run(&image, &mut observer).await {
            Ok(()) => {
                self.advance(DriverState::Ready);
                tracing::info!(count = self.view.recommendations.len(), "recommendations ready");
                Ok(&self.view.recommendations)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    async fn run<F>(&mut self, image: &UploadedImage, observer: &mut F) -> Result<()>
    where
        F: FnMut(&ViewState),
    {
        let session = self.client.negotiate().await?;
        self.advance(DriverState::Invoking);

        let response = self.client.invoke(&session, image).await?;
        self.advance(DriverState::Interpreting);

        let view = &mut self.view;
        let items = interpreter::interpret(response, |items| {
            view.recommendations = items.to_vec();
            observer(&*view);
        })
        .await?;

        self.view.recommendations = items;
        Ok(())
    }

    fn advance(&mut self, next: DriverState) {
        debug_assert!(
            self.view.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.view.state,
            next
        );
        tracing::debug!(from = %self.view.state, to = %next, "driver transition");
        self.view.state = next;
    }

    /// No partial results survive a fatal failure.
    fn fail(&mut self, error: &McpError) {
        tracing::warn!(from = %self.view.state, error = %error, "submission failed");
        self.view.state = DriverState::Failed;
        self.view.recommendations.clear();
        self.view.error = Some(error.to_string());
    }
}
