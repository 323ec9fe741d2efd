// ============ TezDex Test Suite ============
// Cross-crate testing: integration, adversarial, fuzz.
//
// Test categories:
// 1. Integration: full lifecycles (launch -> swap -> invest -> divest,
//    vote -> veto/promote -> withdraw), settled through the sdk
// 2. Adversarial: failure atomicity, authorization, allowance gaps,
//    vote-weight staleness, round-trip arbitrage attempts
// 3. Fuzz/Property: random operation sequences with the pair
//    invariants re-checked after every step

#[cfg(test)]
mod integration;



#[cfg(test)]
mod support;
