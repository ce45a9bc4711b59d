/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use log::debug;
use serde::Serialize;

use crate::engine::Mmv;
use crate::options::OpKind;

#[derive(Serialize)]
struct RepDump {
    from: String,
    to: String,
    displaces: Option<String>,
    cross_device: bool,
    skip: bool,
    del_ok: bool,
    aliased: bool,
    cycle: bool,
    one_dir_link: bool,
}

#[derive(Serialize)]
struct PlanDump {
    op: OpKind,
    live: usize,
    pattern_errors: usize,
    bad_replacements: usize,
    replacements: Vec<RepDump>,
}

/// Dump all replacement structures to the debug sink as JSON.
pub fn dump_plan(mmv: &Mmv) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let replacements: Vec<RepDump> = mmv
        .plan
        .roots()
        .map(|id| {
            let rep = mmv.plan.rep(id);
            RepDump {
                from: mmv.src_of(id),
                to: mmv.dst_of(id),
                displaces: rep.fdel.map(|f| mmv.fname(f)),
                cross_device: rep.cross_device,
                skip: rep.skip,
                del_ok: rep.del_ok,
                aliased: rep.aliased,
                cycle: rep.cycle,
                one_dir_link: rep.one_dir_link,
            }
        })
        .collect();
    let dump = PlanDump {
        op: mmv.opts.op,
        live: mmv.plan.live,
        pattern_errors: mmv.paterr,
        bad_replacements: mmv.badreps,
        replacements,
    };
    match serde_json::to_string_pretty(&dump) {
        Ok(json) => debug!("replacement structures:\n{}", json),
        Err(err) => debug!("replacement structures unavailable: {}", err),
    }
}
