#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlpluck::serial::{json, render, ExportOptions};
use xmlpluck::{NamespacePolicy, ParseOptions, Parser, PathSelector};

fuzz_target!(|data: &[u8]| {
    // Extract -> render -> re-extract should never panic under any policy
    for policy in NamespacePolicy::ALL {
        let opts = ParseOptions::default().namespace(policy).max_tokens(Some(100_000));
        for found in Parser::new(data, PathSelector::new("/*/"), opts.clone()) {
            let Ok(found) = found else { break };
            let _ = json::element_to_value(found.element());
            if let Ok(output) = render(&found, policy, &ExportOptions::default()) {
                for again in Parser::new(output.as_bytes(), PathSelector::new("/"), opts.clone()) {
                    if again.is_err() {
                        break;
                    }
                }
            }
        }
    }
});
