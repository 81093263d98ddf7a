/// Client-side board state.
///
/// Holds the last snapshot from the host plus transient interaction state
/// (drag, open menu, click suppression). Local edits are applied
/// optimistically and return the message to post; the next `refresh` from the
/// host replaces everything, so a rejected edit simply disappears.
use std::time::{Duration, Instant};

use crate::columns::dedupe;
use crate::sync::{ClientMessage, HostMessage, NoticeLevel};
use crate::types::{BoardPayload, WebviewCard, DEFAULT_STATUS};

pub const CARD_DRAG_PREFIX: &str = "card:";
pub const COLUMN_DRAG_PREFIX: &str = "column:";

/// How long after a card drag ends a click is still treated as part of it.
pub const CLICK_SUPPRESSION: Duration = Duration::from_millis(150);

/// Something that can be dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEntity {
    Card(String),
    Column(String),
}

impl DragEntity {
    /// Parse a prefixed drag id (`card:<id>` / `column:<status>`).
    pub fn parse(drag_id: &str) -> Option<Self> {
        if let Some(id) = drag_id.strip_prefix(CARD_DRAG_PREFIX) {
            return Some(DragEntity::Card(id.to_string()));
        }
        drag_id
            .strip_prefix(COLUMN_DRAG_PREFIX)
            .map(|status| DragEntity::Column(status.to_string()))
    }

    pub fn drag_id(&self) -> String {
        match self {
            DragEntity::Card(id) => format!("{}{}", CARD_DRAG_PREFIX, id),
            DragEntity::Column(status) => format!("{}{}", COLUMN_DRAG_PREFIX, status),
        }
    }
}

/// What the pointer was over when the drag ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Column(String),
    Card(String),
    /// Raw status carried by a drop zone that is neither a column nor a card.
    Status(String),
}

impl DropTarget {
    /// Interpret a droppable id, falling back to the zone's status hint.
    pub fn from_over(over_id: &str, status_hint: Option<&str>) -> Option<Self> {
        match DragEntity::parse(over_id) {
            Some(DragEntity::Column(status)) => Some(DropTarget::Column(status)),
            Some(DragEntity::Card(id)) => Some(DropTarget::Card(id)),
            None => status_hint.map(|status| DropTarget::Status(status.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        entity: DragEntity,
        over: Option<DropTarget>,
    },
    /// Dropped; the target still has to be turned into a status.
    PendingDropResolution {
        entity: DragEntity,
        target: Option<DropTarget>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuState {
    Card { card_id: String, submenu_open: bool },
    Column { status: String },
}

#[derive(Debug, Clone)]
pub struct ClientBoard {
    board: BoardPayload,
    drag: DragState,
    menu: Option<MenuState>,
    suppress_open_until: Option<Instant>,
    last_notice: Option<(NoticeLevel, String)>,
    /// Card awaiting a delete confirmation.
    pending_delete: Option<String>,
}

impl ClientBoard {
    pub fn new(initial: BoardPayload) -> Self {
        Self {
            board: initial,
            drag: DragState::Idle,
            menu: None,
            suppress_open_until: None,
            last_notice: None,
            pending_delete: None,
        }
    }

    pub fn board(&self) -> &BoardPayload {
        &self.board
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn menu(&self) -> Option<&MenuState> {
        self.menu.as_ref()
    }

    pub fn last_notice(&self) -> Option<&(NoticeLevel, String)> {
        self.last_notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.last_notice = None;
    }

    /// Apply a message from the host. A refresh replaces the board wholesale
    /// and closes any open menu.
    pub fn apply_host(&mut self, msg: HostMessage) {
        match msg {
            HostMessage::Refresh { payload } => {
                self.board = payload;
                self.menu = None;
                if let Some(id) = &self.pending_delete {
                    if self.board.card(id).is_none() {
                        self.pending_delete = None;
                    }
                }
            }
            HostMessage::Notice { level, message } => {
                self.last_notice = Some((level, message));
            }
        }
    }

    /// Board columns plus any status a card claims, default column first.
    pub fn display_columns(&self) -> Vec<String> {
        let mut combined = dedupe(
            self.board
                .columns
                .iter()
                .chain(self.board.cards.iter().map(|card| &card.status)),
        );

        if let Some(pos) = combined.iter().position(|s| s == DEFAULT_STATUS) {
            let default = combined.remove(pos);
            combined.insert(0, default);
        }
        combined
    }

    /// Cards in one column, in snapshot order.
    pub fn cards_in(&self, status: &str) -> Vec<&WebviewCard> {
        self.board.cards.iter().filter(|card| card.status == status).collect()
    }

    /// Optimistically move a card. `None` when nothing changes.
    pub fn move_card(&mut self, card_id: &str, next_status: &str) -> Option<ClientMessage> {
        let next_status = next_status.trim();
        if next_status.is_empty() {
            return None;
        }
        let card = self.board.cards.iter_mut().find(|card| card.id == card_id)?;
        if card.status == next_status {
            return None;
        }
        card.status = next_status.to_string();

        if !self.board.columns.iter().any(|s| s == next_status) {
            self.board.columns.push(next_status.to_string());
        }

        Some(ClientMessage::MoveCard {
            id: card_id.to_string(),
            status: next_status.to_string(),
        })
    }

    /// Move `dragged` to the position of `target` among the non-default
    /// columns. The default column never moves.
    pub fn reorder_columns(&mut self, dragged: &str, target: &str) -> Option<ClientMessage> {
        if dragged == DEFAULT_STATUS {
            return None;
        }
        let mut others: Vec<String> = self
            .display_columns()
            .into_iter()
            .filter(|s| s != DEFAULT_STATUS)
            .collect();

        let source = others.iter().position(|s| s == dragged)?;
        let destination = if target == DEFAULT_STATUS {
            0
        } else {
            others.iter().position(|s| s == target)?
        };
        if source == destination {
            return None;
        }

        let moved = others.remove(source);
        others.insert(destination, moved);

        let mut columns = Vec::with_capacity(others.len() + 1);
        columns.push(DEFAULT_STATUS.to_string());
        columns.extend(others);
        self.board.columns = columns.clone();

        Some(ClientMessage::ReorderColumns { columns })
    }

    pub fn drag_start(&mut self, drag_id: &str) {
        let Some(entity) = DragEntity::parse(drag_id) else {
            return;
        };
        self.menu = None;
        self.drag = DragState::Dragging { entity, over: None };
    }

    pub fn drag_over(&mut self, target: Option<DropTarget>) {
        if let DragState::Dragging { over, .. } = &mut self.drag {
            *over = target;
        }
    }

    /// Finish a drag: record the drop, then resolve it into a message.
    pub fn drop_on(&mut self, target: Option<DropTarget>, now: Instant) -> Option<ClientMessage> {
        self.end_drag(target);
        self.resolve_drop(now)
    }

    pub fn end_drag(&mut self, target: Option<DropTarget>) {
        if !matches!(self.drag, DragState::Dragging { .. }) {
            return;
        }
        if let DragState::Dragging { entity, .. } = std::mem::take(&mut self.drag) {
            self.drag = DragState::PendingDropResolution { entity, target };
        }
    }

    pub fn resolve_drop(&mut self, now: Instant) -> Option<ClientMessage> {
        if !matches!(self.drag, DragState::PendingDropResolution { .. }) {
            return None;
        }
        let DragState::PendingDropResolution { entity, target } = std::mem::take(&mut self.drag) else {
            return None;
        };
        let status = target.and_then(|target| self.resolve_status(&target));

        match entity {
            DragEntity::Card(card_id) => {
                self.suppress_open_until = Some(now + CLICK_SUPPRESSION);
                status.and_then(|status| self.move_card(&card_id, &status))
            }
            DragEntity::Column(dragged) => match status {
                Some(status) if status != dragged => self.reorder_columns(&dragged, &status),
                _ => None,
            },
        }
    }

    pub fn drag_cancel(&mut self, now: Instant) {
        if let DragState::Dragging {
            entity: DragEntity::Card(_),
            ..
        } = &self.drag
        {
            self.suppress_open_until = Some(now + CLICK_SUPPRESSION);
        }
        self.drag = DragState::Idle;
    }

    /// A click on a card. Ignored while a card is dragged and shortly after.
    pub fn click_open(&mut self, card_id: &str, now: Instant) -> Option<ClientMessage> {
        if matches!(
            self.drag,
            DragState::Dragging {
                entity: DragEntity::Card(_),
                ..
            }
        ) {
            return None;
        }
        if let Some(until) = self.suppress_open_until {
            if now < until {
                return None;
            }
            self.suppress_open_until = None;
        }
        self.board.card(card_id)?;
        self.menu = None;
        Some(ClientMessage::OpenCard {
            id: card_id.to_string(),
        })
    }

    pub fn edit_card(&mut self, card_id: &str) -> Option<ClientMessage> {
        self.board.card(card_id)?;
        self.menu = None;
        Some(ClientMessage::EditCard {
            id: card_id.to_string(),
        })
    }

    /// Ask for confirmation before deleting. False for unknown cards.
    pub fn request_delete(&mut self, card_id: &str) -> bool {
        if self.board.card(card_id).is_none() {
            return false;
        }
        self.menu = None;
        self.pending_delete = Some(card_id.to_string());
        true
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn confirm_delete(&mut self) -> Option<ClientMessage> {
        let id = self.pending_delete.take()?;
        self.board.card(&id)?;
        Some(ClientMessage::DeleteCard { id })
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// The title is entered on the client; a blank one sends nothing.
    pub fn create_card(&mut self, status: &str, title: &str) -> Option<ClientMessage> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        self.menu = None;
        let status = status.trim();
        Some(ClientMessage::CreateCard {
            status: (!status.is_empty()).then(|| status.to_string()),
            title: Some(title.to_string()),
        })
    }

    /// Not offered for the default column.
    pub fn delete_column(&mut self, status: &str) -> Option<ClientMessage> {
        if !self.can_delete_column(status) {
            return None;
        }
        self.menu = None;
        Some(ClientMessage::DeleteColumn {
            status: status.to_string(),
        })
    }

    pub fn can_delete_column(&self, status: &str) -> bool {
        status != DEFAULT_STATUS
    }

    pub fn open_card_menu(&mut self, card_id: &str) {
        self.menu = Some(MenuState::Card {
            card_id: card_id.to_string(),
            submenu_open: false,
        });
    }

    /// Open or close the "move to" submenu of the open card menu.
    pub fn set_submenu_open(&mut self, open: bool) {
        if let Some(MenuState::Card { submenu_open, .. }) = &mut self.menu {
            *submenu_open = open;
        }
    }

    pub fn open_column_menu(&mut self, status: &str) {
        self.menu = Some(MenuState::Column {
            status: status.to_string(),
        });
    }

    pub fn close_menu(&mut self) {
        self.menu = None;
    }

    fn resolve_status(&self, target: &DropTarget) -> Option<String> {
        match target {
            DropTarget::Column(status) | DropTarget::Status(status) => Some(status.clone()),
            DropTarget::Card(card_id) => self.board.card(card_id).map(|card| card.status.clone()),
        }
    }
}
