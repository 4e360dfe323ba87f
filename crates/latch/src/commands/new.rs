//! `latch new`: create a slot and wait for a peer

use latch_protocol::handshake::Role;
use latch_protocol::peer::ConnectionKind;

use crate::cli::NewArgs;
use crate::output;

pub async fn execute(args: NewArgs, json: bool) -> anyhow::Result<()> {
    let (client, slot, passphrase, ice_servers) = super::session::create_slot(&args.relay).await?;

    if json {
        println!("{}", serde_json::json!({"event": "waiting", "slot": slot.to_string(), "code": passphrase}));
    } else {
        output::color::info(&format!("slot {slot} created"));
        println!();
        println!("  Share this passphrase with your peer:");
        println!();
        println!("    {passphrase}");
        println!();
        println!("  On the other machine: latch join {passphrase}");
        println!();
        output::color::info("waiting for peer...");
    }

    let completed = super::session::run(Role::Initiator, client, slot, &passphrase, &ice_servers).await?;

    report(&completed.kind, json);
    if args.verify {
        if json {
            output::verify::display_verification_json(&completed.session_key);
        } else {
            output::verify::display_verification(&completed.session_key, true);
        }
    }

    Ok(())
}

fn report(kind: &ConnectionKind, json: bool) {
    let kind_str = match kind {
        ConnectionKind::Host => "host",
        ConnectionKind::Reflexive => "reflexive",
        ConnectionKind::Relayed => "relayed",
    };
    if json {
        println!("{}", serde_json::json!({"event": "connected", "kind": kind_str}));
    } else {
        output::color::success(&format!("connected ({kind_str})"));
    }
}
