//! Modal message boxes

use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    IDYES, MB_DEFBUTTON2, MB_ICONERROR, MB_ICONINFORMATION, MB_ICONWARNING, MB_OK, MB_YESNO,
    MESSAGEBOX_RESULT, MESSAGEBOX_STYLE, MessageBoxW,
};
use windows::core::HSTRING;

fn message_box(text: &str, title: &str, style: MESSAGEBOX_STYLE) -> MESSAGEBOX_RESULT {
    // SAFETY: both strings outlive the call; a null owner window is allowed
    unsafe {
        MessageBoxW(
            HWND::default(),
            &HSTRING::from(text),
            &HSTRING::from(title),
            style,
        )
    }
}

pub fn show_error(title: &str, text: &str) {
    message_box(text, title, MB_OK | MB_ICONERROR);
}

pub fn show_info(title: &str, text: &str) {
    message_box(text, title, MB_OK | MB_ICONINFORMATION);
}

/// Yes/No prompt defaulting to No.
pub fn confirm(title: &str, text: &str) -> bool {
    message_box(text, title, MB_YESNO | MB_ICONWARNING | MB_DEFBUTTON2) == IDYES
}
