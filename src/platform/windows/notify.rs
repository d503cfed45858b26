//! Windows toast notifications using PowerShell

use std::time::Instant;

use crate::config::Config;
use crate::ui::labels::KillToastThrottle;
use crate::utils::hidden_command;

pub fn maybe_notify_kills(
    config: &Config,
    throttle: &mut KillToastThrottle,
    prev_killed: u64,
    killed: u64,
) {
    if !config.notifications.enabled {
        return;
    }
    if let Some(body) = throttle.observe(prev_killed, killed, Instant::now()) {
        show_toast("DieKnow", &body);
    }
}

pub fn notify_monitor_switched(config: &Config, running: bool) {
    if !config.notifications.enabled {
        return;
    }
    let body = if running {
        "Monitoring started"
    } else {
        "Monitoring stopped"
    };
    show_toast("DieKnow", body);
}

fn show_toast(title: &str, body: &str) {
    // Escape single quotes for PowerShell
    let title = title.replace('\'', "''").replace('`', "``");
    let body = body.replace('\'', "''").replace('`', "``");

    let script = format!(
        r#"
$ErrorActionPreference = 'SilentlyContinue'

if (Get-Module -ListAvailable -Name BurntToast) {{
    Import-Module BurntToast
    New-BurntToastNotification -Text '{title}', '{body}'
}} else {{
    [Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, ContentType = WindowsRuntime] | Out-Null
    [Windows.Data.Xml.Dom.XmlDocument, Windows.Data.Xml.Dom.XmlDocument, ContentType = WindowsRuntime] | Out-Null

    $template = @'
<toast>
    <visual>
        <binding template="ToastGeneric">
            <text>{title}</text>
            <text>{body}</text>
        </binding>
    </visual>
</toast>
'@

    $xml = New-Object Windows.Data.Xml.Dom.XmlDocument
    $xml.LoadXml($template)
    $toast = [Windows.UI.Notifications.ToastNotification]::new($xml)
    [Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier('DieKnow.App').Show($toast)
}}
"#,
        title = title,
        body = body,
    );

    // Fire and forget, hidden to prevent console flicker
    if let Err(e) = hidden_command("powershell")
        .args([
            "-NoProfile",
            "-NonInteractive",
            "-WindowStyle",
            "Hidden",
            "-Command",
            &script,
        ])
        .spawn()
    {
        log::debug!("Failed to launch toast: {}", e);
    }
}
