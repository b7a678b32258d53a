use std::io;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, SendError, Sender};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use crate::query::Edit;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Confirm,
    Cancel,
    Edit(Edit),
    SelectUp,
    SelectDown,
    Press { row: u16 },
    Drag { row: u16 },
    Click { column: u16, row: u16 },
    ScrollUp,
    ScrollDown,
    Resize { height: u16 },
}

/// Keys, resizes and read errors must arrive; mouse commands may be replaced.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    Reliable(Command),
    BestEffort(Command),
}

#[derive(Debug)]
pub enum InputEvent {
    Command(Command),
    Failed(io::Error),
}

pub fn key_command(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let command = match key.code {
        KeyCode::Enter => Command::Confirm,
        KeyCode::Esc => Command::Cancel,
        KeyCode::Left => Command::Edit(Edit::CursorLeft),
        KeyCode::Right => Command::Edit(Edit::CursorRight),
        KeyCode::Up => Command::SelectUp,
        KeyCode::Down => Command::SelectDown,
        KeyCode::Backspace if alt => Command::Edit(Edit::DeleteWordBackward),
        KeyCode::Backspace => Command::Edit(Edit::DeleteBackward),
        KeyCode::Delete => Command::Edit(Edit::DeleteForward),
        KeyCode::Char(c) if ctrl => match c.to_ascii_lowercase() {
            'c' => Command::Cancel,
            'b' => Command::Edit(Edit::CursorLeft),
            'f' => Command::Edit(Edit::CursorRight),
            'd' => Command::Edit(Edit::DeleteForward),
            _ => return None,
        },
        KeyCode::Char(c) if alt => match c {
            'b' => Command::Edit(Edit::WordLeft),
            'f' => Command::Edit(Edit::WordRight),
            _ => return None,
        },
        KeyCode::Char(c) => Command::Edit(Edit::Insert(c)),
        _ => return None,
    };
    Some(command)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Gesture {
    #[default]
    Idle,
    Pressed { row: u16 },
    Dragging { row: u16 },
    Scrolled,
}

/// Press/drag/click disambiguation across mouse events.
#[derive(Debug, Default)]
pub struct MouseGestures {
    state: Gesture,
}

impl MouseGestures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, mouse: MouseEvent) -> Option<Command> {
        let row = mouse.row;
        let (next, command) = match (mouse.kind, self.state) {
            (MouseEventKind::Down(MouseButton::Left), Gesture::Idle | Gesture::Scrolled) => {
                (Gesture::Pressed { row }, Some(Command::Press { row }))
            }
            (
                MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left),
                Gesture::Pressed { row: last } | Gesture::Dragging { row: last },
            ) => {
                if row == last {
                    (self.state, None)
                } else {
                    (Gesture::Dragging { row }, Some(Command::Drag { row }))
                }
            }
            (MouseEventKind::Drag(MouseButton::Left), Gesture::Idle | Gesture::Scrolled) => {
                (Gesture::Dragging { row }, Some(Command::Drag { row }))
            }
            (MouseEventKind::Up(MouseButton::Left), Gesture::Pressed { .. }) => (
                Gesture::Idle,
                Some(Command::Click {
                    column: mouse.column,
                    row,
                }),
            ),
            (MouseEventKind::Up(_), _) => (Gesture::Idle, None),
            (MouseEventKind::ScrollUp, _) => (Gesture::Scrolled, Some(Command::ScrollUp)),
            (MouseEventKind::ScrollDown, _) => (Gesture::Scrolled, Some(Command::ScrollDown)),
            (MouseEventKind::Moved, state) => (state, None),
            _ => (Gesture::Idle, None),
        };
        self.state = next;
        command
    }
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    gestures: MouseGestures,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, event: Event) -> Option<Dispatch> {
        match event {
            Event::Key(key) => key_command(key).map(Dispatch::Reliable),
            Event::Mouse(mouse) => self.gestures.feed(mouse).map(Dispatch::BestEffort),
            Event::Resize(_, height) => Some(Dispatch::Reliable(Command::Resize { height })),
            _ => None,
        }
    }
}

/// Blocking source of terminal events.
pub trait EventSource {
    fn read(&mut self) -> io::Result<Event>;
}

pub struct CrosstermEvents;

impl EventSource for CrosstermEvents {
    fn read(&mut self) -> io::Result<Event> {
        event::read()
    }
}

/// Receiving side consumed by the session's event loop.
pub struct Inputs {
    pub reliable: Receiver<InputEvent>,
    pub mouse: Arc<Mailbox<Command>>,
}

#[derive(Clone)]
pub struct InputSender {
    reliable: Sender<InputEvent>,
    mouse: Arc<Mailbox<Command>>,
}

impl InputSender {
    /// Blocks on the reliable lane until the event loop takes the command.
    pub fn deliver(&self, dispatch: Dispatch) -> std::result::Result<(), SendError<InputEvent>> {
        match dispatch {
            Dispatch::Reliable(command) => self.reliable.send(InputEvent::Command(command)),
            Dispatch::BestEffort(command) => {
                if let Some(dropped) = self.mouse.post(command) {
                    tracing::trace!(?dropped, "mouse command replaced before delivery");
                }
                Ok(())
            }
        }
    }

    pub fn fail(&self, err: io::Error) -> std::result::Result<(), SendError<InputEvent>> {
        self.reliable.send(InputEvent::Failed(err))
    }
}

pub fn channel() -> (InputSender, Inputs) {
    let (reliable_tx, reliable_rx) = bounded(0);
    let mouse = Arc::new(Mailbox::new());
    (
        InputSender {
            reliable: reliable_tx,
            mouse: Arc::clone(&mouse),
        },
        Inputs {
            reliable: reliable_rx,
            mouse,
        },
    )
}

/// Reads `source` on its own thread until it fails or the session is gone.
pub fn spawn_pump<S>(mut source: S) -> Result<Inputs>
where
    S: EventSource + Send + 'static,
{
    let (sender, inputs) = channel();
    thread::Builder::new()
        .name("burrow-input".to_string())
        .spawn(move || {
            let mut dispatcher = Dispatcher::new();
            loop {
                match source.read() {
                    Ok(event) => {
                        let Some(dispatch) = dispatcher.translate(event) else {
                            continue;
                        };
                        if sender.deliver(dispatch).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = sender.fail(err);
                        break;
                    }
                }
            }
        })
        .map_err(|err| Error::spawn("input", err))?;
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    const LEFT: MouseButton = MouseButton::Left;

    #[test]
    fn key_table() {
        let none = KeyModifiers::NONE;
        let ctrl = KeyModifiers::CONTROL;
        let alt = KeyModifiers::ALT;
        let cases = [
            (key(KeyCode::Enter, none), Command::Confirm),
            (key(KeyCode::Esc, none), Command::Cancel),
            (key(KeyCode::Char('c'), ctrl), Command::Cancel),
            (key(KeyCode::Left, none), Command::Edit(Edit::CursorLeft)),
            (key(KeyCode::Char('b'), ctrl), Command::Edit(Edit::CursorLeft)),
            (key(KeyCode::Right, none), Command::Edit(Edit::CursorRight)),
            (key(KeyCode::Char('f'), ctrl), Command::Edit(Edit::CursorRight)),
            (key(KeyCode::Char('b'), alt), Command::Edit(Edit::WordLeft)),
            (key(KeyCode::Char('f'), alt), Command::Edit(Edit::WordRight)),
            (key(KeyCode::Backspace, none), Command::Edit(Edit::DeleteBackward)),
            (
                key(KeyCode::Backspace, alt),
                Command::Edit(Edit::DeleteWordBackward),
            ),
            (key(KeyCode::Delete, none), Command::Edit(Edit::DeleteForward)),
            (key(KeyCode::Char('d'), ctrl), Command::Edit(Edit::DeleteForward)),
            (key(KeyCode::Char(' '), none), Command::Edit(Edit::Insert(' '))),
            (key(KeyCode::Char('Q'), KeyModifiers::SHIFT), Command::Edit(Edit::Insert('Q'))),
            (key(KeyCode::Up, none), Command::SelectUp),
            (key(KeyCode::Down, none), Command::SelectDown),
        ];
        for (event, expected) in cases {
            assert_eq!(key_command(event), Some(expected), "{event:?}");
        }
    }

    #[test]
    fn unmapped_and_released_keys_are_dropped() {
        assert_eq!(key_command(key(KeyCode::Char('x'), KeyModifiers::ALT)), None);
        assert_eq!(key_command(key(KeyCode::Char('z'), KeyModifiers::CONTROL)), None);
        assert_eq!(key_command(key(KeyCode::F(1), KeyModifiers::NONE)), None);

        let mut release = key(KeyCode::Enter, KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(key_command(release), None);
    }

    #[test]
    fn press_then_release_is_a_click() {
        let mut g = MouseGestures::new();
        assert_eq!(
            g.feed(mouse(MouseEventKind::Down(LEFT), 4, 5)),
            Some(Command::Press { row: 5 })
        );
        assert_eq!(
            g.feed(mouse(MouseEventKind::Up(LEFT), 4, 5)),
            Some(Command::Click { column: 4, row: 5 })
        );
    }

    #[test]
    fn release_after_drag_is_suppressed() {
        let mut g = MouseGestures::new();
        g.feed(mouse(MouseEventKind::Down(LEFT), 4, 5));
        assert_eq!(
            g.feed(mouse(MouseEventKind::Drag(LEFT), 4, 6)),
            Some(Command::Drag { row: 6 })
        );
        assert_eq!(
            g.feed(mouse(MouseEventKind::Down(LEFT), 4, 7)),
            Some(Command::Drag { row: 7 })
        );
        assert_eq!(g.feed(mouse(MouseEventKind::Up(LEFT), 4, 7)), None);

        // The next press starts a fresh gesture.
        assert_eq!(
            g.feed(mouse(MouseEventKind::Down(LEFT), 4, 7)),
            Some(Command::Press { row: 7 })
        );
    }

    #[test]
    fn jitter_on_the_same_row_keeps_the_click() {
        let mut g = MouseGestures::new();
        g.feed(mouse(MouseEventKind::Down(LEFT), 4, 5));
        assert_eq!(g.feed(mouse(MouseEventKind::Drag(LEFT), 5, 5)), None);
        assert_eq!(
            g.feed(mouse(MouseEventKind::Up(LEFT), 5, 5)),
            Some(Command::Click { column: 5, row: 5 })
        );
    }

    #[test]
    fn wheel_scrolls_and_ends_the_gesture() {
        let mut g = MouseGestures::new();
        assert_eq!(
            g.feed(mouse(MouseEventKind::ScrollDown, 0, 0)),
            Some(Command::ScrollDown)
        );
        g.feed(mouse(MouseEventKind::Down(LEFT), 1, 4));
        assert_eq!(
            g.feed(mouse(MouseEventKind::ScrollUp, 0, 0)),
            Some(Command::ScrollUp)
        );
        assert_eq!(g.feed(mouse(MouseEventKind::Up(LEFT), 1, 4)), None);
    }

    #[test]
    fn dispatcher_routes_lanes() {
        let mut d = Dispatcher::new();
        assert_eq!(
            d.translate(Event::Key(key(KeyCode::Enter, KeyModifiers::NONE))),
            Some(Dispatch::Reliable(Command::Confirm))
        );
        assert_eq!(
            d.translate(Event::Mouse(mouse(MouseEventKind::ScrollUp, 0, 0))),
            Some(Dispatch::BestEffort(Command::ScrollUp))
        );
        assert_eq!(
            d.translate(Event::Resize(80, 24)),
            Some(Dispatch::Reliable(Command::Resize { height: 24 }))
        );
        assert_eq!(d.translate(Event::FocusGained), None);
    }

    struct Scripted(VecDeque<io::Result<Event>>);

    impl EventSource for Scripted {
        fn read(&mut self) -> io::Result<Event> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::other("script exhausted")))
        }
    }

    #[test]
    fn pump_delivers_keys_then_failure() {
        let script = Scripted(VecDeque::from([
            Ok(Event::Key(key(KeyCode::Char('a'), KeyModifiers::NONE))),
            Ok(Event::FocusLost),
            Ok(Event::Key(key(KeyCode::Enter, KeyModifiers::NONE))),
        ]));
        let inputs = spawn_pump(script).unwrap();
        let timeout = Duration::from_secs(5);

        match inputs.reliable.recv_timeout(timeout).unwrap() {
            InputEvent::Command(command) => {
                assert_eq!(command, Command::Edit(Edit::Insert('a')))
            }
            InputEvent::Failed(err) => panic!("unexpected failure {err}"),
        }
        match inputs.reliable.recv_timeout(timeout).unwrap() {
            InputEvent::Command(command) => assert_eq!(command, Command::Confirm),
            InputEvent::Failed(err) => panic!("unexpected failure {err}"),
        }
        assert!(matches!(
            inputs.reliable.recv_timeout(timeout).unwrap(),
            InputEvent::Failed(_)
        ));
    }

    #[test]
    fn mouse_lane_never_blocks() {
        let (sender, inputs) = channel();
        for row in 0..100 {
            sender
                .deliver(Dispatch::BestEffort(Command::Press { row }))
                .unwrap();
        }
        assert_eq!(inputs.mouse.take(), Some(Command::Press { row: 99 }));
    }
}
