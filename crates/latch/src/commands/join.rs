//! `latch join`: join a slot using a passphrase read out of band

use latch_protocol::handshake::Role;
use latch_protocol::peer::ConnectionKind;

use crate::cli::JoinArgs;
use crate::output;

pub async fn execute(args: JoinArgs, json: bool) -> anyhow::Result<()> {
    let (client, slot, ice_servers) = super::session::join_slot(&args.relay, &args.code).await?;

    if !json {
        output::color::info(&format!("joined slot {slot}, completing handshake..."));
    }

    let completed = super::session::run(Role::Joiner, client, slot, &args.code, &ice_servers).await?;

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
