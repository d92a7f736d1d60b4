//! Buchmann-Dahmen-Szydlo amortised authentication-path traversal.
//!
//! Reduces the per-signature authentication-path cost from O(h * 2^h) leaf
//! computations down to O(h) plus a handful of incremental "treehash"
//! updates, at the cost of carrying a traversal state between signatures.
//! `bds_k` top levels are fully materialised in `retain` rather than
//! traversed.

use crate::error::XmssResult;
use crate::hash::thash_h;
use crate::hash_address::*;
use crate::params::XmssParams;
use crate::utils::{bytes_to_ull, ull_to_bytes};
use crate::xmss_commons::gen_leaf_wots;

/// Largest hash output length across every supported parameter set.
pub(crate) const XMSS_MAX_N: usize = 64;
/// Largest full (hypertree) height across every supported parameter set.
pub(crate) const XMSS_MAX_FULL_HEIGHT: usize = 60;
/// Largest single-tree height across every supported parameter set.
pub(crate) const XMSS_MAX_TREE_HEIGHT: usize = 20;
/// Largest XMSS-MT layer count across every supported parameter set.
pub(crate) const XMSS_MAX_D: usize = 12;
/// Largest `bds_k` retain parameter this crate accepts.
pub(crate) const XMSS_MAX_BDS_K: usize = 4;
/// Largest `retain` table size, `2^bds_k - bds_k - 1` at `bds_k = XMSS_MAX_BDS_K`.
pub(crate) const XMSS_MAX_RETAIN: usize = (1 << XMSS_MAX_BDS_K) - XMSS_MAX_BDS_K - 1;
/// Largest WOTS+ chain count (`wots_len = wots_len1 + wots_len2`) across
/// every supported parameter set, reached at `n = 64`, `w = 16`.
pub(crate) const XMSS_MAX_WOTS_LEN: usize = 131;

/// One partial treehash traversal, responsible for pre-computing a single
/// `treehash[].node` entry ahead of when `bds_round` will need it.
#[derive(Clone, Copy)]
pub(crate) struct BdsTreehashInst {
    pub(crate) node: [u8; XMSS_MAX_N],
    pub(crate) h: u32,
    pub(crate) next_idx: u32,
    pub(crate) stack_usage: u32,
    pub(crate) completed: bool,
}

impl Default for BdsTreehashInst {
    fn default() -> Self {
        Self {
            node: [0u8; XMSS_MAX_N],
            h: 0,
            next_idx: 0,
            stack_usage: 0,
            completed: false,
        }
    }
}

/// Amortised authentication-path state for a single XMSS tree.
///
/// Every array is sized to the largest parameter set this crate supports
/// (see [`XMSS_MAX_N`], [`XMSS_MAX_TREE_HEIGHT`], [`XMSS_MAX_BDS_K`]); only
/// the prefix implied by the live `XmssParams` is meaningful. This keeps
/// the state a plain, non-allocating value type while still letting a
/// single type serve every `(n, tree_height, bds_k)` combination.
#[derive(Clone, Copy)]
pub struct BdsState {
    pub(crate) stack: [[u8; XMSS_MAX_N]; XMSS_MAX_TREE_HEIGHT + 1],
    pub(crate) stack_levels: [u32; XMSS_MAX_TREE_HEIGHT + 1],
    pub(crate) stack_offset: u32,
    pub(crate) auth: [[u8; XMSS_MAX_N]; XMSS_MAX_TREE_HEIGHT],
    pub(crate) keep: [[u8; XMSS_MAX_N]; XMSS_MAX_TREE_HEIGHT / 2],
    pub(crate) treehash: [BdsTreehashInst; XMSS_MAX_TREE_HEIGHT],
    pub(crate) retain: [[u8; XMSS_MAX_N]; XMSS_MAX_RETAIN],
    pub(crate) next_leaf: u32,
    /// Root produced once this tree (or "next" tree) is fully built.
    pub(crate) root: [u8; XMSS_MAX_N],
    // Private full-build stack used while warming up a "next" tree one
    // leaf at a time across many calls to `bds_state_advance_one_leaf`.
    // Kept separate from `stack`/`stack_levels`/`stack_offset`, which are
    // reserved for the incremental treehash instances of an *active* tree.
    pub(crate) build_stack: [[u8; XMSS_MAX_N]; XMSS_MAX_TREE_HEIGHT + 1],
    pub(crate) build_levels: [u32; XMSS_MAX_TREE_HEIGHT + 1],
    pub(crate) build_offset: u32,
}

impl Default for BdsState {
    fn default() -> Self {
        Self {
            stack: [[0u8; XMSS_MAX_N]; XMSS_MAX_TREE_HEIGHT + 1],
            stack_levels: [0u32; XMSS_MAX_TREE_HEIGHT + 1],
            stack_offset: 0,
            auth: [[0u8; XMSS_MAX_N]; XMSS_MAX_TREE_HEIGHT],
            keep: [[0u8; XMSS_MAX_N]; XMSS_MAX_TREE_HEIGHT / 2],
            treehash: [BdsTreehashInst::default(); XMSS_MAX_TREE_HEIGHT],
            retain: [[0u8; XMSS_MAX_N]; XMSS_MAX_RETAIN],
            next_leaf: 0,
            root: [0u8; XMSS_MAX_N],
            build_stack: [[0u8; XMSS_MAX_N]; XMSS_MAX_TREE_HEIGHT + 1],
            build_levels: [0u32; XMSS_MAX_TREE_HEIGHT + 1],
            build_offset: 0,
        }
    }
}

impl core::fmt::Debug for BdsState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BdsState")
            .field("next_leaf", &self.next_leaf)
            .field("stack_offset", &self.stack_offset)
            .finish_non_exhaustive()
    }
}

/// Computes a single leaf: `l_tree(wots_pkgen(sk_seed, pub_seed, ots_addr))`.
fn gen_leaf(
    params: &XmssParams,
    sk_seed: &[u8],
    pub_seed: &[u8],
    leaf_idx: u32,
    subtree_addr: &[u32; 8],
) -> XmssResult<[u8; XMSS_MAX_N]> {
    let n = params.n as usize;
    let mut ots_addr = [0u32; 8];
    let mut ltree_addr = [0u32; 8];
    copy_subtree_addr(&mut ots_addr, subtree_addr);
    copy_subtree_addr(&mut ltree_addr, subtree_addr);
    set_type(&mut ots_addr, XMSS_ADDR_TYPE_OTS);
    set_type(&mut ltree_addr, XMSS_ADDR_TYPE_LTREE);
    set_ots_addr(&mut ots_addr, leaf_idx);
    set_ltree_addr(&mut ltree_addr, leaf_idx);

    let mut leaf = [0u8; XMSS_MAX_N];
    gen_leaf_wots(
        params,
        &mut leaf[..n],
        sk_seed,
        pub_seed,
        &mut ltree_addr,
        &mut ots_addr,
    )?;
    Ok(leaf)
}

/// Captures a freshly merged stack node into `auth`, `treehash[].node`, or
/// `retain`, following the same bit-pattern rule `bds_treehash_init` and
/// `bds_state_advance_one_leaf` both rely on (they build the same tree,
/// one all at once and one incrementally).
fn capture_merged_node(
    state: &mut BdsState,
    tree_height: usize,
    bds_k: usize,
    n: usize,
    i: u32,
    nodeh: u32,
    node: &[u8; XMSS_MAX_N],
) {
    if (i >> nodeh) == 1 {
        state.auth[nodeh as usize][..n].copy_from_slice(&node[..n]);
    } else if (nodeh as usize) < tree_height - bds_k && (i >> nodeh) == 3 {
        state.treehash[nodeh as usize].node[..n].copy_from_slice(&node[..n]);
    } else if nodeh as usize >= tree_height - bds_k {
        let off = (1usize << (tree_height - 1 - nodeh as usize)) + nodeh as usize - tree_height;
        let row = ((i >> nodeh) as usize - 3) >> 1;
        state.retain[off + row][..n].copy_from_slice(&node[..n]);
    }
}

/// Builds a full tree once, capturing the BDS state as it goes: the
/// authentication path for leaf 0, the seed nodes for every treehash
/// instance below the retained top, and the retained top `bds_k` levels.
/// Run once during keygen (and, incrementally, to warm up XMSS-MT "next"
/// trees via [`bds_state_advance_one_leaf`]).
pub(crate) fn bds_treehash_init(
    params: &XmssParams,
    state: &mut BdsState,
    sk_seed: &[u8],
    pub_seed: &[u8],
    subtree_addr: &[u32; 8],
) -> XmssResult<()> {
    let n = params.n as usize;
    let tree_height = params.tree_height as usize;
    let bds_k = params.bds_k as usize;

    let mut stack = [[0u8; XMSS_MAX_N]; XMSS_MAX_TREE_HEIGHT + 1];
    let mut stack_levels = [0u32; XMSS_MAX_TREE_HEIGHT + 1];
    let mut stack_offset: usize = 0;

    for th in state.treehash.iter_mut().take(tree_height - bds_k) {
        *th = BdsTreehashInst {
            completed: true,
            ..BdsTreehashInst::default()
        };
    }
    for (i, th) in state.treehash.iter_mut().take(tree_height - bds_k).enumerate() {
        th.h = i as u32;
    }
    state.stack_offset = 0;
    state.next_leaf = 0;

    let mut node_addr = [0u32; 8];
    copy_subtree_addr(&mut node_addr, subtree_addr);
    set_type(&mut node_addr, XMSS_ADDR_TYPE_HASHTREE);

    let lastnode: u32 = 1u32 << params.tree_height;
    let mut i: u32 = 0;
    for idx in 0..lastnode {
        let leaf = gen_leaf(params, sk_seed, pub_seed, idx, subtree_addr)?;
        stack[stack_offset][..n].copy_from_slice(&leaf[..n]);
        stack_levels[stack_offset] = 0;
        stack_offset += 1;

        while stack_offset > 1 && stack_levels[stack_offset - 1] == stack_levels[stack_offset - 2]
        {
            let nodeh = stack_levels[stack_offset - 1];
            let merged_child = stack[stack_offset - 1];
            capture_merged_node(state, tree_height, bds_k, n, i, nodeh, &merged_child);

            set_tree_height(&mut node_addr, nodeh);
            set_tree_index(&mut node_addr, idx >> (nodeh + 1));

            let mut buf = [0u8; 2 * XMSS_MAX_N];
            buf[..n].copy_from_slice(&stack[stack_offset - 2][..n]);
            buf[n..2 * n].copy_from_slice(&stack[stack_offset - 1][..n]);
            let mut out = [0u8; XMSS_MAX_N];
            thash_h(params, &mut out[..n], &buf[..2 * n], pub_seed, &mut node_addr)?;
            stack[stack_offset - 2][..n].copy_from_slice(&out[..n]);
            stack_levels[stack_offset - 2] += 1;
            stack_offset -= 1;
        }
        i += 1;
    }

    state.root[..n].copy_from_slice(&stack[0][..n]);
    Ok(())
}

/// Advances the warm-up build of a "next" tree (XMSS-MT) by exactly one
/// leaf. Semantically the same accumulation `bds_treehash_init` performs
/// in a single call, spread one leaf per invocation so an upper-layer
/// tree can be built incrementally across many signatures of the layer
/// below. Returns `true` once the tree is fully built (its root is then
/// available in `state.root` and its `auth`/`treehash`/`retain` entries
/// are primed exactly as a freshly keygen'd tree's would be).
pub(crate) fn bds_state_advance_one_leaf(
    params: &XmssParams,
    state: &mut BdsState,
    sk_seed: &[u8],
    pub_seed: &[u8],
    subtree_addr: &[u32; 8],
) -> XmssResult<bool> {
    let n = params.n as usize;
    let tree_height = params.tree_height as usize;
    let bds_k = params.bds_k as usize;
    let lastnode: u32 = 1u32 << params.tree_height;

    if state.next_leaf >= lastnode {
        return Ok(true);
    }

    if state.next_leaf == 0 {
        for th in state.treehash.iter_mut().take(tree_height - bds_k) {
            *th = BdsTreehashInst {
                completed: true,
                ..BdsTreehashInst::default()
            };
        }
        for (i, th) in state.treehash.iter_mut().take(tree_height - bds_k).enumerate() {
            th.h = i as u32;
        }
        state.build_offset = 0;
    }

    let idx = state.next_leaf;
    let leaf = gen_leaf(params, sk_seed, pub_seed, idx, subtree_addr)?;
    state.build_stack[state.build_offset as usize][..n].copy_from_slice(&leaf[..n]);
    state.build_levels[state.build_offset as usize] = 0;
    state.build_offset += 1;

    let mut node_addr = [0u32; 8];
    copy_subtree_addr(&mut node_addr, subtree_addr);
    set_type(&mut node_addr, XMSS_ADDR_TYPE_HASHTREE);

    while state.build_offset > 1
        && state.build_levels[(state.build_offset - 1) as usize]
            == state.build_levels[(state.build_offset - 2) as usize]
    {
        let nodeh = state.build_levels[(state.build_offset - 1) as usize];
        let merged_child = state.build_stack[(state.build_offset - 1) as usize];
        capture_merged_node(state, tree_height, bds_k, n, idx, nodeh, &merged_child);

        set_tree_height(&mut node_addr, nodeh);
        set_tree_index(&mut node_addr, idx >> (nodeh + 1));

        let mut buf = [0u8; 2 * XMSS_MAX_N];
        buf[..n].copy_from_slice(&state.build_stack[(state.build_offset - 2) as usize][..n]);
        buf[n..2 * n].copy_from_slice(&state.build_stack[(state.build_offset - 1) as usize][..n]);
        let mut out = [0u8; XMSS_MAX_N];
        thash_h(params, &mut out[..n], &buf[..2 * n], pub_seed, &mut node_addr)?;
        state.build_stack[(state.build_offset - 2) as usize][..n].copy_from_slice(&out[..n]);
        state.build_levels[(state.build_offset - 2) as usize] += 1;
        state.build_offset -= 1;
    }

    state.next_leaf += 1;

    if state.next_leaf == lastnode {
        state.root[..n].copy_from_slice(&state.build_stack[0][..n]);
        state.stack_offset = 0;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Updates the authentication path after leaf `leaf_idx` has just been
/// signed: finds tau, the lowest zero bit of `leaf_idx`, refills
/// `auth[0..tau]` from completed treehash instances or retained nodes,
/// and restarts the treehash instances that are now behind schedule.
pub(crate) fn bds_round(
    params: &XmssParams,
    state: &mut BdsState,
    leaf_idx: u32,
    sk_seed: &[u8],
    pub_seed: &[u8],
    subtree_addr: &[u32; 8],
) -> XmssResult<()> {
    let n = params.n as usize;
    let tree_height = params.tree_height as usize;
    let bds_k = params.bds_k as usize;

    let mut tau: u32 = tree_height as u32;
    for i in 0..tree_height as u32 {
        if (leaf_idx >> i) & 1 == 0 {
            tau = i;
            break;
        }
    }

    let mut buf = [0u8; 2 * XMSS_MAX_N];
    if tau > 0 {
        buf[..n].copy_from_slice(&state.auth[(tau - 1) as usize][..n]);
        buf[n..2 * n].copy_from_slice(&state.keep[((tau - 1) / 2) as usize][..n]);
    }

    if (leaf_idx >> (tau + 1)) & 1 == 0 && (tau as usize) < tree_height - 1 {
        let auth_tau = state.auth[tau as usize];
        state.keep[(tau / 2) as usize][..n].copy_from_slice(&auth_tau[..n]);
    }

    if tau == 0 {
        let leaf = gen_leaf(params, sk_seed, pub_seed, leaf_idx, subtree_addr)?;
        state.auth[0][..n].copy_from_slice(&leaf[..n]);
    } else {
        let mut node_addr = [0u32; 8];
        copy_subtree_addr(&mut node_addr, subtree_addr);
        set_type(&mut node_addr, XMSS_ADDR_TYPE_HASHTREE);
        set_tree_height(&mut node_addr, tau - 1);
        set_tree_index(&mut node_addr, leaf_idx >> tau);

        let mut out = [0u8; XMSS_MAX_N];
        thash_h(params, &mut out[..n], &buf[..2 * n], pub_seed, &mut node_addr)?;
        state.auth[tau as usize][..n].copy_from_slice(&out[..n]);

        for i in 0..tau as usize {
            if i < tree_height - bds_k {
                let node = state.treehash[i].node;
                state.auth[i][..n].copy_from_slice(&node[..n]);
            } else {
                let off = (1usize << (tree_height - 1 - i)) + i - tree_height;
                let row = (((leaf_idx >> i) as usize) - 1) >> 1;
                let node = state.retain[off + row];
                state.auth[i][..n].copy_from_slice(&node[..n]);
            }
        }

        for i in 0..core::cmp::min(tau as usize, tree_height - bds_k) {
            let startidx = leaf_idx + 1 + 3 * (1u32 << i);
            if u64::from(startidx) < (1u64 << tree_height) {
                state.treehash[i] = BdsTreehashInst {
                    h: i as u32,
                    next_idx: startidx,
                    completed: false,
                    stack_usage: 0,
                    node: [0u8; XMSS_MAX_N],
                };
            }
        }
    }
    Ok(())
}

/// Byte length of a serialized [`BdsState`] for the given parameters.
/// Layout: `stack || stack_levels || stack_offset || auth || keep ||
/// treehash (node || h || next_idx || stack_usage || completed) || retain
/// || next_leaf || root`. Sized from the *live* `tree_height`/`bds_k`, not
/// the enumerated maxima, so serialized state does not carry padding for
/// parameter sets it was never built with.
pub(crate) fn bds_serialized_size(params: &XmssParams) -> usize {
    let n = params.n as usize;
    let tree_height = params.tree_height as usize;
    let bds_k = params.bds_k as usize;
    let retain_len = if bds_k == 0 {
        0
    } else {
        (1 << bds_k) - bds_k - 1
    };

    (tree_height + 1) * n // stack
        + (tree_height + 1) * 4 // stack_levels
        + 4 // stack_offset
        + tree_height * n // auth
        + (tree_height / 2) * n // keep
        + (tree_height - bds_k) * (n + 4 + 4 + 4 + 1) // treehash instances
        + retain_len * n // retain
        + 4 // next_leaf
        + n // root
}

/// Serializes the live prefix of `state` (per the current parameter set)
/// into `out`, which must be exactly [`bds_serialized_size`] bytes.
pub(crate) fn bds_serialize(params: &XmssParams, out: &mut [u8], state: &BdsState) -> XmssResult<()> {
    let n = params.n as usize;
    let tree_height = params.tree_height as usize;
    let bds_k = params.bds_k as usize;
    let mut off = 0usize;

    for i in 0..=tree_height {
        out[off..off + n].copy_from_slice(&state.stack[i][..n]);
        off += n;
    }
    for i in 0..=tree_height {
        ull_to_bytes(&mut out[off..off + 4], u64::from(state.stack_levels[i]));
        off += 4;
    }
    ull_to_bytes(&mut out[off..off + 4], u64::from(state.stack_offset));
    off += 4;
    for i in 0..tree_height {
        out[off..off + n].copy_from_slice(&state.auth[i][..n]);
        off += n;
    }
    for i in 0..tree_height / 2 {
        out[off..off + n].copy_from_slice(&state.keep[i][..n]);
        off += n;
    }
    for th in state.treehash.iter().take(tree_height - bds_k) {
        out[off..off + n].copy_from_slice(&th.node[..n]);
        off += n;
        ull_to_bytes(&mut out[off..off + 4], u64::from(th.h));
        off += 4;
        ull_to_bytes(&mut out[off..off + 4], u64::from(th.next_idx));
        off += 4;
        ull_to_bytes(&mut out[off..off + 4], u64::from(th.stack_usage));
        off += 4;
        out[off] = u8::from(th.completed);
        off += 1;
    }
    let retain_len = if bds_k == 0 { 0 } else { (1 << bds_k) - bds_k - 1 };
    for i in 0..retain_len {
        out[off..off + n].copy_from_slice(&state.retain[i][..n]);
        off += n;
    }
    ull_to_bytes(&mut out[off..off + 4], u64::from(state.next_leaf));
    off += 4;
    out[off..off + n].copy_from_slice(&state.root[..n]);
    off += n;

    debug_assert_eq!(off, bds_serialized_size(params));
    Ok(())
}

/// Deserializes a [`BdsState`] previously written by [`bds_serialize`].
/// Zeroes the state first, then validates `input`'s length.
pub(crate) fn bds_deserialize(params: &XmssParams, input: &[u8]) -> XmssResult<BdsState> {
    let expected = bds_serialized_size(params);
    if input.len() != expected {
        return Err(crate::error::Error::BdsStateMismatch {
            expected,
            got: input.len(),
        });
    }

    let n = params.n as usize;
    let tree_height = params.tree_height as usize;
    let bds_k = params.bds_k as usize;
    let mut state = BdsState::default();
    let mut off = 0usize;

    for i in 0..=tree_height {
        state.stack[i][..n].copy_from_slice(&input[off..off + n]);
        off += n;
    }
    for i in 0..=tree_height {
        state.stack_levels[i] = bytes_to_ull(&input[off..off + 4]) as u32;
        off += 4;
    }
    state.stack_offset = bytes_to_ull(&input[off..off + 4]) as u32;
    off += 4;
    for i in 0..tree_height {
        state.auth[i][..n].copy_from_slice(&input[off..off + n]);
        off += n;
    }
    for i in 0..tree_height / 2 {
        state.keep[i][..n].copy_from_slice(&input[off..off + n]);
        off += n;
    }
    for th in state.treehash.iter_mut().take(tree_height - bds_k) {
        th.node[..n].copy_from_slice(&input[off..off + n]);
        off += n;
        th.h = bytes_to_ull(&input[off..off + 4]) as u32;
        off += 4;
        th.next_idx = bytes_to_ull(&input[off..off + 4]) as u32;
        off += 4;
        th.stack_usage = bytes_to_ull(&input[off..off + 4]) as u32;
        off += 4;
        th.completed = input[off] != 0;
        off += 1;
    }
    let retain_len = if bds_k == 0 { 0 } else { (1 << bds_k) - bds_k - 1 };
    for i in 0..retain_len {
        state.retain[i][..n].copy_from_slice(&input[off..off + n]);
        off += n;
    }
    state.next_leaf = bytes_to_ull(&input[off..off + 4]) as u32;
    off += 4;
    state.root[..n].copy_from_slice(&input[off..off + n]);
    off += n;

    debug_assert_eq!(off, expected);
    Ok(state)
}

fn treehash_minheight_on_stack(state: &BdsState, th: &BdsTreehashInst) -> u32 {
    let mut r = XMSS_MAX_TREE_HEIGHT as u32;
    for i in 0..th.stack_usage {
        let lev = state.stack_levels[(state.stack_offset - i - 1) as usize];
        if lev < r {
            r = lev;
        }
    }
    r
}

#[allow(clippy::too_many_arguments)]
fn treehash_update_one(
    params: &XmssParams,
    th: &mut BdsTreehashInst,
    stack: &mut [[u8; XMSS_MAX_N]; XMSS_MAX_TREE_HEIGHT + 1],
    stack_levels: &mut [u32; XMSS_MAX_TREE_HEIGHT + 1],
    stack_offset: &mut u32,
    sk_seed: &[u8],
    pub_seed: &[u8],
    subtree_addr: &[u32; 8],
) -> XmssResult<()> {
    let n = params.n as usize;
    let mut node = gen_leaf(params, sk_seed, pub_seed, th.next_idx, subtree_addr)?;
    let mut nodeheight: u32 = 0;

    let mut node_addr = [0u32; 8];
    copy_subtree_addr(&mut node_addr, subtree_addr);
    set_type(&mut node_addr, XMSS_ADDR_TYPE_HASHTREE);

    while th.stack_usage > 0 && stack_levels[(*stack_offset - 1) as usize] == nodeheight {
        let mut buf = [0u8; 2 * XMSS_MAX_N];
        buf[..n].copy_from_slice(&stack[(*stack_offset - 1) as usize][..n]);
        buf[n..2 * n].copy_from_slice(&node[..n]);

        set_tree_height(&mut node_addr, nodeheight);
        set_tree_index(&mut node_addr, th.next_idx >> (nodeheight + 1));

        let mut out = [0u8; XMSS_MAX_N];
        thash_h(params, &mut out[..n], &buf[..2 * n], pub_seed, &mut node_addr)?;
        node = out;

        nodeheight += 1;
        th.stack_usage -= 1;
        *stack_offset -= 1;
    }

    if nodeheight == th.h {
        th.node[..n].copy_from_slice(&node[..n]);
        th.completed = true;
    } else {
        stack[*stack_offset as usize][..n].copy_from_slice(&node[..n]);
        th.stack_usage += 1;
        stack_levels[*stack_offset as usize] = nodeheight;
        *stack_offset += 1;
        th.next_idx += 1;
    }
    Ok(())
}

/// Runs up to `updates` leaf-generation steps, each time advancing the
/// treehash instance with the lowest priority (a completed instance is
/// never picked; an empty-stack instance's priority is its own level;
/// otherwise its priority is the lowest height among its stacked entries).
pub(crate) fn bds_treehash_update(
    params: &XmssParams,
    state: &mut BdsState,
    updates: u32,
    sk_seed: &[u8],
    pub_seed: &[u8],
    subtree_addr: &[u32; 8],
) -> XmssResult<()> {
    let tree_height = params.tree_height as usize;
    let bds_k = params.bds_k as usize;
    let limit = tree_height - bds_k;

    for _ in 0..updates {
        let mut l_min = tree_height as u32;
        let mut level = limit;

        for (i, th) in state.treehash.iter().take(limit).enumerate() {
            let low = if th.completed {
                tree_height as u32
            } else if th.stack_usage == 0 {
                i as u32
            } else {
                treehash_minheight_on_stack(state, th)
            };
            if low < l_min {
                level = i;
                l_min = low;
            }
        }

        if level == limit {
            break;
        }

        let mut th = state.treehash[level];
        treehash_update_one(
            params,
            &mut th,
            &mut state.stack,
            &mut state.stack_levels,
            &mut state.stack_offset,
            sk_seed,
            pub_seed,
            subtree_addr,
        )?;
        state.treehash[level] = th;
    }
    Ok(())
}
