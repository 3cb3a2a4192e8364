use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    env_logger::init();
    for profile in TranscriptProfile::ALL {
        record_profile(profile)?;
    }
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::new(profile.options())?;
    session.write_header(profile.header())?;
    match profile {
        TranscriptProfile::LongPress => record_long_press(&mut session),
        TranscriptProfile::MultiPress => record_multi_press(&mut session),
        TranscriptProfile::ActionSwitch => record_action_switch(&mut session),
    }
}

fn record_long_press(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("help long-press")?;
    let _ = session.handle_command("long-press")?;
    let _ = session.handle_command("long-press delay=1s duration=3s")?;
    let _ = session.handle_command("long-press delay=2s duration=1s")?;
    let _ = session.handle_command("events")?;
    let _ = session.handle_command("status")?;
    Ok(())
}

fn record_multi_press(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("help multi-press")?;
    let _ = session.handle_command("multi-press")?;
    let _ = session.handle_command("multi-press count=3 hold=150ms gap=100ms")?;
    let _ = session.handle_command("multi-press count=5")?;
    let _ = session.handle_command("events")?;
    Ok(())
}

fn record_action_switch(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("status")?;
    let _ = session.handle_command("multi-press count=2")?;
    let _ = session.handle_command("multi-press count=4")?;
    let _ = session.handle_command("events")?;
    Ok(())
}
