//! A headless demo that opens the message context menu on a small in-memory chat,
//! runs it for a few frames, and activates one of its actions.

use std::{
    path::PathBuf,
    rc::Rc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use chat_menu::{
    animation::AnimationScheduler,
    collaborators::{
        AnimationInfo, AnimationRef, AnimationSource, ChatType, ChatView, Collaborators, EditKind,
        Message, MessageFlags, MessageId, PeerId, PeerPermissions, ReactionCatalog, ReactionDescriptor,
        ReactionSender, ReactorEntry, ReactorsList, ReactorsProvider, SelectionSnapshot,
    },
    home::{
        connection_status::{ConnectionState, ConnectionStatus, ConnectionUpdate, NetworkerStatus, enqueue_connection_update},
        message_actions::ActionKind,
        message_context_menu::{Gesture, GestureKind, HitElement, MessageContextMenu},
    },
    persistence::{MenuSettings, default_menu_settings_path, load_menu_settings},
    shared::{geometry::dvec2, lookup::Lookup},
};
use clap::Parser;
use tokio::runtime::{Handle, Runtime};

const DEMO_PEER: PeerId = -1001;
const FRAME: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
struct Cli {
    /// The menu settings file to load. Defaults to the one in the app's data directory.
    #[clap(short, long)]
    settings: Option<PathBuf>,

    /// Lay out the menu for a touchscreen device.
    #[clap(long, action)]
    touch: bool,

    /// Show reactions as static icons.
    #[clap(long, action)]
    no_animations: bool,

    /// Log debug messages.
    #[clap(short, long, action)]
    verbose: bool,
}

/// A chat with a handful of messages, whose slower lookups are answered by background tasks.
struct DemoChat {
    runtime: Handle,
    messages: Vec<Message>,
}

impl DemoChat {
    fn new(runtime: Handle) -> Self {
        let mut own = Message::new(DEMO_PEER, 3, "See you there!");
        own.flags = MessageFlags::Out;
        own.recent_reactions = vec![7, 8];
        Self {
            runtime,
            messages: vec![
                Message::new(DEMO_PEER, 1, "Meeting at noon?"),
                Message::new(DEMO_PEER, 2, "Works for me."),
                own,
            ],
        }
    }
}

impl ChatView for DemoChat {
    fn peer_id(&self) -> PeerId { DEMO_PEER }
    fn chat_type(&self) -> ChatType { ChatType::Chat }
    fn message(&self, mid: MessageId) -> Option<Message> {
        self.messages.iter().find(|m| m.mid == mid).cloned()
    }
    fn mids_by_mid(&self, mid: MessageId) -> Vec<MessageId> { vec![mid] }
    fn selection(&self) -> SelectionSnapshot { SelectionSnapshot::default() }
    fn can_select(&self, _mid: MessageId) -> bool { true }
    fn can_send(&self) -> bool { true }
    fn has_message_input(&self) -> bool { true }
}

impl PeerPermissions for DemoChat {
    fn can_forward(&self, _message: &Message) -> bool { true }
    fn can_edit(&self, message: &Message, kind: EditKind) -> bool { kind == EditKind::Text && message.is_out() }
    fn can_delete(&self, message: &Message) -> bool { message.is_out() }
    fn can_pin(&self, _peer_id: PeerId) -> bool { true }
    fn is_channel(&self, _peer_id: PeerId) -> bool { false }
    fn is_user(&self, _peer_id: PeerId) -> bool { false }
    fn can_view_read_participants(&self, message: &Message) -> bool { message.is_out() }
    fn participants_count(&self, _peer_id: PeerId) -> Option<u32> { Some(4) }
    fn username(&self, _peer_id: PeerId) -> Option<String> { Some("demo_group".into()) }
    fn display_name(&self, peer_id: PeerId) -> String { format!("User {peer_id}") }
}

impl ReactionCatalog for DemoChat {
    fn available_reactions(&self, _message: &Message) -> Lookup<anyhow::Result<Vec<ReactionDescriptor>>> {
        let reactions = ["👍", "❤️", "😂", "😮", "😢", "🔥", "🎉"]
            .into_iter()
            .map(|r| ReactionDescriptor {
                reaction: r.to_owned(),
                static_icon: AnimationRef(format!("{r}/static")),
                appear_animation: AnimationRef(format!("{r}/appear")),
                select_animation: AnimationRef(format!("{r}/select")),
            })
            .collect();
        Lookup::ready(Ok(reactions))
    }
}

impl ReactionSender for DemoChat {
    fn send_reaction(&self, message: &Message, reaction: &str) {
        println!("Sent reaction {reaction} to message {}", message.mid);
    }
}

impl ReactorsProvider for DemoChat {
    fn reactions_and_read_participants(&self, message: &Message) -> Lookup<anyhow::Result<ReactorsList>> {
        let (sender, lookup) = Lookup::pending();
        let reactors = message.recent_reactions.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let combined = reactors.into_iter()
                .map(|peer_id| ReactorEntry { peer_id, reaction: Some("👍".into()) })
                .collect();
            let _ = sender.send(Ok(ReactorsList { combined }));
        });
        lookup
    }
}

impl AnimationSource for DemoChat {
    fn fetch(&self, resource: &AnimationRef, _size: u32) -> Lookup<anyhow::Result<AnimationInfo>> {
        let frame_count = if resource.0.ends_with("appear") { 30 } else { 60 };
        let (sender, lookup) = Lookup::pending();
        self.runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = sender.send(Ok(AnimationInfo { frame_count }));
        });
        lookup
    }
}

fn run_frames(menu: &mut MessageContextMenu, now: &mut Instant, count: usize) {
    for _ in 0..count {
        std::thread::sleep(FRAME);
        *now += FRAME;
        menu.process_pending_updates();
        menu.on_frame(*now);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();
    } else {
        tracing_subscriber::fmt::init();
    }

    let runtime = Runtime::new().context("Failed to create the tokio runtime")?;
    let mut settings = match cli.settings.or_else(default_menu_settings_path) {
        Some(path) => runtime.block_on(load_menu_settings(&path))?,
        None => MenuSettings::default(),
    };
    settings.platform.is_touch |= cli.touch;
    settings.animations_enabled &= !cli.no_animations;

    let chat = Rc::new(DemoChat::new(runtime.handle().clone()));
    let collaborators = Collaborators {
        chat: chat.clone(),
        permissions: chat.clone(),
        reaction_catalog: chat.clone(),
        reaction_sender: chat.clone(),
        reactors: chat.clone(),
        animations: chat,
    };
    let (action_sender, action_receiver) = crossbeam_channel::unbounded();
    let gesture_kind = if settings.platform.is_touch { GestureKind::Tap } else { GestureKind::ContextMenu };
    let mut menu = MessageContextMenu::new(settings, collaborators, AnimationScheduler::new(), action_sender);
    let mut now = Instant::now();

    let gesture = Gesture {
        kind: gesture_kind,
        position: dvec2(640.0, 360.0),
        path: vec![
            HitElement::MessageText,
            HitElement::ContentWrapper,
            HitElement::Bubble { mid: 3, is_date_separator: false, is_incoming: false },
        ],
        is_text_selected: false,
    };
    menu.open(&gesture, dvec2(1280.0, 720.0), now)?;
    if let Some(open) = menu.menu() {
        let labels: Vec<_> = open.actions.iter().map(|a| a.label).filter(|l| !l.is_empty()).collect();
        println!("Menu at {:?} with actions: {}", open.placement.position, labels.join(", "));
    }

    run_frames(&mut menu, &mut now, 10);
    if let Some(viewers) = menu.menu().and_then(|m| m.viewers.as_ref()) {
        println!("Viewers button: {} (avatars: {:?})", viewers.main_label(), viewers.avatars());
    }

    menu.activate(ActionKind::Copy, now);
    for action in action_receiver.try_iter() {
        println!("Posted action: {action:?}");
    }
    run_frames(&mut menu, &mut now, 20);
    println!("Menu state after closing: {:?}", menu.state());

    let (connection_sender, connection_receiver) = crossbeam_channel::unbounded();
    let mut status = ConnectionStatus::new(2, connection_sender, now);
    enqueue_connection_update(ConnectionUpdate::Networker(NetworkerStatus {
        dc_id: 2,
        state: ConnectionState::Connecting,
        retry_at: None,
    }));
    status.process_pending_updates(now);
    status.on_timer(now + Duration::from_secs(1));
    if let Some(text) = status.status_text() {
        println!("Connection banner (shown: {}): {}", status.is_shown(), text.render(now));
    }
    for action in connection_receiver.try_iter() {
        println!("Connection action: {action:?}");
    }
    Ok(())
}
