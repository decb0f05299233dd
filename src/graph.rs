use crate::{
    config::TransportSettings,
    error::{GridcastError, GridcastResult},
    layout::{CELL_HEIGHT, CELL_WIDTH, LayoutSlot, PlannedFeed},
};

/// Decode chain for one selected feed: network source through to the named
/// queue feeding the compositor.
#[derive(Clone, Debug)]
pub struct SourceChain {
    pub url: String,
    pub slot_index: usize,
}

/// The single compositing stage plus the encode chain hanging off it.
#[derive(Clone, Debug)]
pub struct CompositorStage {
    pub slots: Vec<LayoutSlot>,
}

/// Trailing transport configuration for the WebRTC output element.
#[derive(Clone, Debug)]
pub struct TransportStage {
    pub stun_server: String,
}

#[derive(Clone, Debug)]
pub enum Stage {
    Source(SourceChain),
    Compositor(CompositorStage),
    Transport(TransportStage),
}

impl Stage {
    fn append_tokens(&self, out: &mut Vec<String>) {
        match self {
            Stage::Source(s) => s.append_tokens(out),
            Stage::Compositor(s) => s.append_tokens(out),
            Stage::Transport(s) => s.append_tokens(out),
        }
    }
}

fn push_tokens(out: &mut Vec<String>, tokens: &[&str]) {
    out.extend(tokens.iter().map(|t| (*t).to_string()));
}

impl SourceChain {
    fn append_tokens(&self, out: &mut Vec<String>) {
        out.push("rtspsrc".to_string());
        out.push(format!("location={}", self.url));
        out.push("latency=100".to_string());
        push_tokens(
            out,
            &[
                "!",
                "rtph264depay",
                "!",
                "h264parse",
                "!",
                "avdec_h264",
                "!",
                "videoconvert",
                "!",
                "videoscale",
                "!",
            ],
        );
        out.push(format!("video/x-raw,width={CELL_WIDTH},height={CELL_HEIGHT}"));
        push_tokens(out, &["!", "queue"]);
        out.push(format!("name=q{}", self.slot_index));
    }
}

impl CompositorStage {
    fn append_tokens(&self, out: &mut Vec<String>) {
        // Slot 0 is pinned to the origin; the grid formula takes over from
        // slot 1.
        push_tokens(
            out,
            &["compositor", "name=mix", "sink_0::xpos=0", "sink_0::ypos=0"],
        );
        for slot in self.slots.iter().skip(1) {
            out.push(format!("sink_{}::xpos={}", slot.index, slot.x));
            out.push(format!("sink_{}::ypos={}", slot.index, slot.y));
        }
        push_tokens(
            out,
            &[
                "!",
                "videoconvert",
                "!",
                "x264enc",
                "tune=zerolatency",
                "bitrate=2048",
                "speed-preset=ultrafast",
                "!",
                "rtph264pay",
                "!",
                "queue",
                "!",
                "webrtcbin",
                "bundle-policy=max-bundle",
                "name=sendrecv",
            ],
        );
    }
}

impl TransportStage {
    fn append_tokens(&self, out: &mut Vec<String>) {
        out.push(format!("sendrecv.stun-server={}", self.stun_server));
    }
}

/// A fully resolved pipeline description, immutable once built.
///
/// The target syntax is positional: sources first, then the compositor and
/// encode chain, then the transport configuration. Consumers get either the
/// whole description (for logs and dry runs) or the token vector that becomes
/// the worker's argv tail.
#[derive(Debug)]
pub struct PipelineGraph {
    tokens: Vec<String>,
}

impl PipelineGraph {
    pub fn description(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn launch_args(&self) -> &[String] {
        &self.tokens
    }

    #[cfg(test)]
    pub(crate) fn from_tokens(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

/// Compose the planned feeds and transport settings into one pipeline
/// description.
pub fn build(
    planned: &[PlannedFeed],
    transport: &TransportSettings,
) -> GridcastResult<PipelineGraph> {
    if planned.is_empty() {
        return Err(GridcastError::no_valid_feeds(
            "cannot build a pipeline with zero sources",
        ));
    }

    let mut stages: Vec<Stage> = planned
        .iter()
        .map(|p| {
            Stage::Source(SourceChain {
                url: p.feed.url.clone(),
                slot_index: p.slot.index,
            })
        })
        .collect();
    stages.push(Stage::Compositor(CompositorStage {
        slots: planned.iter().map(|p| p.slot).collect(),
    }));
    stages.push(Stage::Transport(TransportStage {
        stun_server: transport.stun_server.clone(),
    }));

    let mut tokens = Vec::new();
    for stage in &stages {
        stage.append_tokens(&mut tokens);
    }
    let graph = PipelineGraph { tokens };

    tracing::info!(pipeline = %graph.description(), "resolved pipeline graph");
    Ok(graph)
}
