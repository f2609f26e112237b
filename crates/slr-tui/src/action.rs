/// Everything the user can ask the TUI to do. Key bindings live in
/// [`crate::input`]; the meaning of a few actions depends on the active tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Tick,
    Resize(u16, u16),

    // Navigation
    NextTab,
    ShowAssistant,
    ShowDatabase,
    MoveUp,
    MoveDown,
    /// Left/right: strategy choice on the Assistant tab, sub-tab on Database.
    Left,
    Right,
    GoTop,
    GoBottom,
    /// Enter in normal mode.
    Activate,
    /// Space in normal mode.
    Toggle,
    NavigateBack,

    // Projects and connection
    NextProject,
    PrevProject,
    NewProject,
    Reconnect,
    Refresh,

    // Papers and queries
    StartFilter,
    RemovePaper,
    OpenLink,
    OpenPdf,
    CopyToClipboard,

    // Text input
    Input(char),
    Backspace,
    NextField,
    Submit,
    Cancel,

    ToggleHelp,
    CycleTheme,
    None,
}
