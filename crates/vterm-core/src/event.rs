/// Events a terminal can raise between render ticks. Delivered to the pool's
/// registered callback (see `vterm-pool`'s event fan-out) so a host can wake
/// its UI loop without polling every open terminal on a timer.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalEvent {
    /// The cursor's blink phase flipped; repaint the cursor cell only.
    CursorBlink,
    /// The shell rang the terminal bell (BEL, 0x07).
    Bell,
    /// The window/tab title changed via an OSC escape.
    TitleChanged(String),
    /// Row `line` (absolute) was written to since the last snapshot.
    Damaged { line: u64 },
    /// The child process exited with the given status code.
    Exited { code: i32 },
    /// The PTY and shell process are fully spawned and ready for input.
    SessionReady,
}
