use zeroize::Zeroize;

use crate::bds::{
    BdsState, XMSS_MAX_D, XMSS_MAX_N, XMSS_MAX_WOTS_LEN, bds_deserialize, bds_round,
    bds_serialize, bds_serialized_size, bds_state_advance_one_leaf, bds_treehash_init,
    bds_treehash_update,
};
use crate::error::{Error, XmssResult};
use crate::hash::{hash_message, prf};
use crate::hash_address::*;
use crate::params::XmssParams;
use crate::utils::{bytes_to_ull, ull_to_bytes};
use crate::wots::wots_sign;

/// Given a set of parameters, this function returns the size of the secret key.
pub fn xmss_xmssmt_core_sk_bytes(params: &XmssParams) -> u64 {
    params.index_bytes as u64 + 4 * params.n as u64
}

/// Per-layer BDS traversal state for an XMSS-MT key: one active subtree
/// state per layer, plus (for every layer but the top) a state warming up
/// the subtree that will replace it once the active one is exhausted, plus
/// a cached WOTS+ signature per layer boundary (`wots_sigs[i]` signs layer
/// `i`'s current root using a key at layer `i + 1`). The cache is rebuilt
/// only when the lower layer's root actually changes (a rollover), not on
/// every `sign()` call.
///
/// A plain XMSS key (`d == 1`) uses only `active[0]`; `next` and
/// `wots_sigs` stay unused.
#[derive(Clone, Copy)]
pub(crate) struct XmssMtBdsState {
    pub(crate) active: [BdsState; XMSS_MAX_D],
    pub(crate) next: [BdsState; XMSS_MAX_D],
    pub(crate) wots_sigs: [[u8; XMSS_MAX_WOTS_LEN * XMSS_MAX_N]; XMSS_MAX_D],
}

impl Default for XmssMtBdsState {
    fn default() -> Self {
        Self {
            active: [BdsState::default(); XMSS_MAX_D],
            next: [BdsState::default(); XMSS_MAX_D],
            wots_sigs: [[0u8; XMSS_MAX_WOTS_LEN * XMSS_MAX_N]; XMSS_MAX_D],
        }
    }
}

impl core::fmt::Debug for XmssMtBdsState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("XmssMtBdsState").finish_non_exhaustive()
    }
}

fn layer_addr(layer: u32, tree_idx: u64) -> [u32; 8] {
    let mut addr = [0u32; 8];
    set_layer_addr(&mut addr, layer);
    set_tree_addr(&mut addr, tree_idx);
    addr
}

/// Derives an XMSS/XMSS-MT key pair from a given seed, building one BDS
/// authentication-path state per layer (each at tree index 0, the subtree
/// every layer starts on) bottom-up, signing each non-top layer's root
/// with a WOTS+ key at the layer above and caching the result in
/// `states.wots_sigs`. Seed must be 3*n bytes.
///
/// Format sk: `[(ceil(h/8) bit) index || SK_SEED || SK_PRF || root || PUB_SEED]`
/// Format pk: `[root || PUB_SEED]`, omitting the algorithm OID.
pub fn xmssmt_core_seed_keypair(
    params: &XmssParams,
    pk: &mut [u8],
    sk: &mut [u8],
    seed: &[u8],
    states: &mut XmssMtBdsState,
) -> XmssResult<()> {
    let n = params.n as usize;
    let idx_bytes = params.index_bytes as usize;

    for b in sk[..idx_bytes].iter_mut() {
        *b = 0;
    }

    sk[idx_bytes..idx_bytes + 2 * n].copy_from_slice(&seed[..2 * n]);
    sk[idx_bytes + 3 * n..idx_bytes + 4 * n].copy_from_slice(&seed[2 * n..3 * n]);
    pk[n..2 * n].copy_from_slice(&sk[idx_bytes + 3 * n..idx_bytes + 4 * n]);

    let sk_seed = sk[idx_bytes..idx_bytes + n].to_vec();
    let pub_seed = pk[n..2 * n].to_vec();

    for i in 0..params.d {
        let addr = layer_addr(i, 0);
        bds_treehash_init(
            params,
            &mut states.active[i as usize],
            &sk_seed,
            &pub_seed,
            &addr,
        )?;

        if i > 0 {
            let root = states.active[(i - 1) as usize].root;
            let mut addr = layer_addr(i, 0);
            set_ots_addr(&mut addr, 0);
            wots_sign(
                params,
                &mut states.wots_sigs[(i - 1) as usize],
                &root[..n],
                &sk_seed,
                &pub_seed,
                &mut addr,
            )?;
        }
    }

    let top = (params.d - 1) as usize;
    let root = states.active[top].root;
    sk[idx_bytes + 2 * n..idx_bytes + 3 * n].copy_from_slice(&root[..n]);
    pk[..n].copy_from_slice(&root[..n]);

    Ok(())
}

/// Rebuilds the per-layer BDS states for a secret key whose current index
/// is not necessarily zero and for which no persisted [`XmssMtBdsState`] is
/// available (for example, a key freshly parsed from raw bytes). Builds
/// each layer's active subtree from its own leaf zero and fast-forwards it
/// to the key's current leaf by replaying `bds_round`/`bds_treehash_update`
/// exactly as ordinary signing would, reconstructs each non-top layer's
/// cached `wots_sigs` entry from the fast-forwarded root, then leaves the
/// "next" subtree warm-up to start from scratch on subsequent signatures.
///
/// This is the one place this crate pays the O(2^tree_height) cost BDS
/// otherwise avoids; it is only reached when resuming a key without its
/// traversal state, not on any hot signing path.
pub(crate) fn derive_states_for_index(
    params: &XmssParams,
    sk: &[u8],
    states: &mut XmssMtBdsState,
) -> XmssResult<()> {
    let n = params.n as usize;
    let idx_bytes = params.index_bytes as usize;
    let th = u64::from(params.tree_height);
    let mask = (1u64 << th) - 1;

    let idx = bytes_to_ull(&sk[..idx_bytes]);
    let sk_seed = &sk[idx_bytes..idx_bytes + n];
    let pub_seed = &sk[idx_bytes + 3 * n..idx_bytes + 4 * n];

    for i in 0..params.d {
        let tree_idx = idx >> (th * u64::from(i + 1));
        let idx_leaf = ((idx >> (th * u64::from(i))) & mask) as u32;
        let addr = layer_addr(i, tree_idx);

        bds_treehash_init(params, &mut states.active[i as usize], sk_seed, pub_seed, &addr)?;
        for leaf in 0..idx_leaf {
            bds_round(params, &mut states.active[i as usize], leaf, sk_seed, pub_seed, &addr)?;
            bds_treehash_update(
                params,
                &mut states.active[i as usize],
                params.tree_height,
                sk_seed,
                pub_seed,
                &addr,
            )?;
        }
        states.next[i as usize] = BdsState::default();

        if i > 0 {
            let root = states.active[(i - 1) as usize].root;
            let mut parent_addr = layer_addr(i, tree_idx);
            set_ots_addr(&mut parent_addr, idx_leaf);
            wots_sign(
                params,
                &mut states.wots_sigs[(i - 1) as usize],
                &root[..n],
                sk_seed,
                pub_seed,
                &mut parent_addr,
            )?;
        }
    }
    Ok(())
}

/// Byte length of [`serialize_active_states`]'s output for the given
/// parameters: one serialized active [`BdsState`] per layer, plus one
/// cached WOTS+ signature per non-top layer.
pub(crate) fn active_states_serialized_size(params: &XmssParams) -> usize {
    params.d as usize * bds_serialized_size(params)
        + (params.d as usize - 1) * params.wots_sig_bytes as usize
}

/// Serializes the *active* subtree state for every layer plus the cached
/// `wots_sigs`, so a [`SigningKey`](crate::SigningKey) can resume signing
/// without paying [`derive_states_for_index`]'s full rebuild. Deliberately
/// omits the "next" warm-up subtrees, the same limitation
/// `derive_states_for_index` already accepts: a key restored this way
/// pays one extra rebuild on the signature that next rolls a layer over,
/// never a correctness issue, only that one signature's cost.
pub(crate) fn serialize_active_states(params: &XmssParams, states: &XmssMtBdsState) -> Vec<u8> {
    let mut out = vec![0u8; active_states_serialized_size(params)];
    let bds_len = bds_serialized_size(params);
    let wots_len = params.wots_sig_bytes as usize;
    let mut off = 0usize;

    for i in 0..params.d as usize {
        bds_serialize(params, &mut out[off..off + bds_len], &states.active[i])
            .expect("fixed-size buffer matches bds_serialized_size");
        off += bds_len;
    }
    for i in 0..params.d as usize - 1 {
        out[off..off + wots_len].copy_from_slice(&states.wots_sigs[i][..wots_len]);
        off += wots_len;
    }
    out
}

/// Restores the active per-layer state and cached `wots_sigs` previously
/// produced by [`serialize_active_states`]. Leaves every "next" warm-up
/// subtree at its default, to be rebuilt incrementally by ordinary
/// signing, exactly as [`derive_states_for_index`] does.
pub(crate) fn deserialize_active_states(
    params: &XmssParams,
    input: &[u8],
) -> XmssResult<XmssMtBdsState> {
    let expected = active_states_serialized_size(params);
    if input.len() != expected {
        return Err(Error::BdsStateMismatch {
            expected,
            got: input.len(),
        });
    }

    let mut states = XmssMtBdsState::default();
    let bds_len = bds_serialized_size(params);
    let wots_len = params.wots_sig_bytes as usize;
    let mut off = 0usize;

    for i in 0..params.d as usize {
        states.active[i] = bds_deserialize(params, &input[off..off + bds_len])?;
        off += bds_len;
    }
    for i in 0..params.d as usize - 1 {
        states.wots_sigs[i][..wots_len].copy_from_slice(&input[off..off + wots_len]);
        off += wots_len;
    }
    Ok(states)
}

/// Generates an XMSS/XMSS-MT key pair for a given parameter set.
pub fn xmssmt_core_keypair<R: rand::CryptoRng>(
    params: &XmssParams,
    pk: &mut [u8],
    sk: &mut [u8],
    rng: &mut R,
    states: &mut XmssMtBdsState,
) -> XmssResult<()> {
    let n = params.n as usize;
    let mut seed = vec![0u8; 3 * n];

    rng.fill_bytes(&mut seed[..]);
    let result = xmssmt_core_seed_keypair(params, pk, sk, &seed, states);
    seed.zeroize();
    result
}

/// Signs a message using the amortised BDS authentication-path state,
/// returning the signature followed by the message, and advances `sk`
/// and `states` so the next call produces the following signature.
pub fn xmssmt_core_sign(
    params: &XmssParams,
    sk: &mut [u8],
    m: &[u8],
    states: &mut XmssMtBdsState,
) -> XmssResult<Vec<u8>> {
    let n = params.n as usize;
    let idx_bytes = params.index_bytes as usize;
    let mlen = m.len();
    let sig_bytes = params.sig_bytes as usize;
    let th = u64::from(params.tree_height);
    let d = params.d;
    let mask = (1u64 << th) - 1;

    let sk_seed_start = idx_bytes;
    let sk_prf_start = idx_bytes + n;
    let pub_root_start = idx_bytes + 2 * n;
    let pub_seed_start = idx_bytes + 3 * n;

    let idx = bytes_to_ull(&sk[..idx_bytes]);

    let max_idx = if params.full_height >= 64 {
        u64::MAX
    } else {
        (1u64 << params.full_height) - 1
    };
    if idx > max_idx {
        return Err(Error::KeyExhausted);
    }

    let mut sk_seed = sk[sk_seed_start..sk_seed_start + n].to_vec();
    let mut sk_prf = sk[sk_prf_start..sk_prf_start + n].to_vec();
    let pub_root = sk[pub_root_start..pub_root_start + n].to_vec();
    let pub_seed = sk[pub_seed_start..pub_seed_start + n].to_vec();

    let mut sm = vec![0u8; sig_bytes + mlen];
    sm[sig_bytes..].copy_from_slice(m);
    sm[..idx_bytes].copy_from_slice(&sk[..idx_bytes]);

    if idx == max_idx {
        for b in sk[..idx_bytes].iter_mut() {
            *b = 0xFF;
        }
    } else {
        ull_to_bytes(&mut sk[..idx_bytes], idx + 1);
    }

    let mut idx_bytes_32 = [0u8; 32];
    ull_to_bytes(&mut idx_bytes_32, idx);
    prf(
        params,
        &mut sm[idx_bytes..idx_bytes + n],
        &idx_bytes_32,
        &sk_prf,
    )?;

    let mut message_digest = [0u8; XMSS_MAX_N];
    let prefix_len = params.padding_len as usize + 3 * n;
    let prefix_start = sig_bytes - prefix_len;
    let r_val = sm[idx_bytes..idx_bytes + n].to_vec();
    hash_message(
        params,
        &mut message_digest[..n],
        &r_val,
        &pub_root,
        idx,
        &mut sm[prefix_start..],
        mlen as u64,
    )?;

    let mut sm_offset = idx_bytes + n;

    for i in 0..d {
        if i == 0 {
            let idx_leaf = (idx & mask) as u32;
            let tree_idx = idx >> th;
            let mut addr = layer_addr(0, tree_idx);
            set_ots_addr(&mut addr, idx_leaf);

            wots_sign(
                params,
                &mut sm[sm_offset..],
                &message_digest[..n],
                &sk_seed,
                &pub_seed,
                &mut addr,
            )?;
        } else {
            let wots_sig_bytes = params.wots_sig_bytes as usize;
            sm[sm_offset..sm_offset + wots_sig_bytes]
                .copy_from_slice(&states.wots_sigs[(i - 1) as usize][..wots_sig_bytes]);
        }
        sm_offset += params.wots_sig_bytes as usize;

        let auth = states.active[i as usize].auth;
        for (h, node) in auth.iter().take(params.tree_height as usize).enumerate() {
            sm[sm_offset + h * n..sm_offset + (h + 1) * n].copy_from_slice(&node[..n]);
        }
        sm_offset += params.tree_height as usize * n;
    }

    // Shared per-signature treehash-update budget, as in a multi-tree
    // traversal's `updates = (tree_height - bds_k) / 2`: each active layer's
    // treehash gets up to this many leaf-generation steps per call, and the
    // same pool pays for warming up the idle "next" subtrees one leaf at a
    // time so every instance completes before its tree rolls over.
    let mut updates = (params.tree_height - params.bds_k) / 2;

    if d > 1 {
        let next_addr = layer_addr(0, (idx >> th) + 1);
        bds_state_advance_one_leaf(
            params,
            &mut states.next[0],
            &sk_seed,
            &pub_seed,
            &next_addr,
        )?;
    }

    for i in 0..d {
        let idx_leaf = ((idx >> (th * u64::from(i))) & mask) as u32;
        let tree_idx = idx >> (th * u64::from(i + 1));
        let low_bits_mask = (1u64 << (th * u64::from(i))) - 1;
        let should_advance = (idx & low_bits_mask) == low_bits_mask;

        let mut just_swapped = false;
        if should_advance {
            let own_bits_mask = (1u64 << (th * u64::from(i + 1))) - 1;
            let is_last_leaf_of_own_tree = (idx & own_bits_mask) == own_bits_mask;

            if is_last_leaf_of_own_tree {
                if i + 1 < d && idx < max_idx {
                    just_swapped = true;
                    states.active[i as usize] = states.next[i as usize];
                    states.next[i as usize] = BdsState::default();

                    let idx_next = idx + 1;
                    let parent_tree_idx = idx_next >> (th * u64::from(i + 2));
                    let parent_ots =
                        ((idx_next >> (th * u64::from(i + 1))) & mask) as u32;
                    let root = states.active[i as usize].root;
                    let mut parent_addr = layer_addr(i + 1, parent_tree_idx);
                    set_ots_addr(&mut parent_addr, parent_ots);
                    wots_sign(
                        params,
                        &mut states.wots_sigs[i as usize],
                        &root[..n],
                        &sk_seed,
                        &pub_seed,
                        &mut parent_addr,
                    )?;

                    if updates > 0 {
                        updates -= 1;
                    }
                }
            } else {
                let addr = layer_addr(i, tree_idx);
                bds_round(
                    params,
                    &mut states.active[i as usize],
                    idx_leaf,
                    &sk_seed,
                    &pub_seed,
                    &addr,
                )?;
                bds_treehash_update(
                    params,
                    &mut states.active[i as usize],
                    updates,
                    &sk_seed,
                    &pub_seed,
                    &addr,
                )?;
            }
        }

        if i > 0 && i + 1 < d && updates > 0 && !just_swapped {
            let next_addr = layer_addr(i, tree_idx + 1);
            bds_state_advance_one_leaf(
                params,
                &mut states.next[i as usize],
                &sk_seed,
                &pub_seed,
                &next_addr,
            )?;
            updates -= 1;
        }
    }

    sk_seed.zeroize();
    sk_prf.zeroize();

    if idx == max_idx {
        #[allow(clippy::cast_possible_truncation)]
        let sk_bytes_len = params.sk_bytes as usize;
        for b in sk[idx_bytes..sk_bytes_len].iter_mut() {
            *b = 0;
        }
    }

    Ok(sm)
}

/// Naive, non-amortised authentication-path computation kept for
/// differential testing against the BDS engine: recomputes the entire
/// subtree from scratch for every signature, O(tree_height * 2^tree_height).
#[cfg(feature = "naive-auth-path")]
pub mod naive {
    use zeroize::Zeroize;

    use crate::error::{Error, XmssResult};
    use crate::hash::{hash_message, prf, thash_h};
    use crate::hash_address::*;
    use crate::params::XmssParams;
    use crate::utils::{bytes_to_ull, ull_to_bytes};
    use crate::wots::wots_sign;
    use crate::xmss_commons::gen_leaf_wots;

    /// For a given leaf index, computes the authentication path and the
    /// resulting root node using Merkle's TreeHash algorithm, from scratch.
    fn treehash(
        params: &XmssParams,
        root: &mut [u8],
        auth_path: &mut [u8],
        sk_seed: &[u8],
        pub_seed: &[u8],
        leaf_idx: u32,
        subtree_addr: &[u32; 8],
    ) -> XmssResult<()> {
        let n = params.n as usize;
        let tree_height = params.tree_height as usize;
        let mut stack = vec![0u8; (tree_height + 1) * n];
        let mut heights = vec![0u32; tree_height + 1];
        let mut offset: usize = 0;

        let mut ots_addr = [0u32; 8];
        let mut ltree_addr = [0u32; 8];
        let mut node_addr = [0u32; 8];

        copy_subtree_addr(&mut ots_addr, subtree_addr);
        copy_subtree_addr(&mut ltree_addr, subtree_addr);
        copy_subtree_addr(&mut node_addr, subtree_addr);

        set_type(&mut ots_addr, XMSS_ADDR_TYPE_OTS);
        set_type(&mut ltree_addr, XMSS_ADDR_TYPE_LTREE);
        set_type(&mut node_addr, XMSS_ADDR_TYPE_HASHTREE);

        let num_leaves: u32 = 1 << params.tree_height;
        for idx in 0..num_leaves {
            set_ltree_addr(&mut ltree_addr, idx);
            set_ots_addr(&mut ots_addr, idx);
            gen_leaf_wots(
                params,
                &mut stack[offset * n..(offset + 1) * n],
                sk_seed,
                pub_seed,
                &mut ltree_addr,
                &mut ots_addr,
            )?;
            offset += 1;
            heights[offset - 1] = 0;

            if (leaf_idx ^ 0x1) == idx {
                auth_path[..n].copy_from_slice(&stack[(offset - 1) * n..offset * n]);
            }

            while offset >= 2 && heights[offset - 1] == heights[offset - 2] {
                let tree_idx = idx >> (heights[offset - 1] + 1);

                set_tree_height(&mut node_addr, heights[offset - 1]);
                set_tree_index(&mut node_addr, tree_idx);
                let tmp = stack[(offset - 2) * n..offset * n].to_vec();
                thash_h(
                    params,
                    &mut stack[(offset - 2) * n..(offset - 1) * n],
                    &tmp,
                    pub_seed,
                    &mut node_addr,
                )?;
                offset -= 1;
                heights[offset - 1] += 1;

                if ((leaf_idx >> heights[offset - 1]) ^ 0x1) == tree_idx {
                    let h = heights[offset - 1] as usize;
                    auth_path[h * n..(h + 1) * n]
                        .copy_from_slice(&stack[(offset - 1) * n..offset * n]);
                }
            }
        }
        root[..n].copy_from_slice(&stack[..n]);
        Ok(())
    }

    /// Derives an XMSS/XMSS-MT key pair from a seed without any BDS state.
    pub fn xmssmt_core_seed_keypair(
        params: &XmssParams,
        pk: &mut [u8],
        sk: &mut [u8],
        seed: &[u8],
    ) -> XmssResult<()> {
        let n = params.n as usize;
        let idx_bytes = params.index_bytes as usize;
        let tree_height = params.tree_height as usize;
        let mut auth_path = vec![0u8; tree_height * n];
        let mut top_tree_addr = [0u32; 8];
        set_layer_addr(&mut top_tree_addr, params.d - 1);

        for b in sk[..idx_bytes].iter_mut() {
            *b = 0;
        }

        sk[idx_bytes..idx_bytes + 2 * n].copy_from_slice(&seed[..2 * n]);
        sk[idx_bytes + 3 * n..idx_bytes + 4 * n].copy_from_slice(&seed[2 * n..3 * n]);
        pk[n..2 * n].copy_from_slice(&sk[idx_bytes + 3 * n..idx_bytes + 4 * n]);

        let pub_seed_copy = pk[n..2 * n].to_vec();
        treehash(
            params,
            pk,
            &mut auth_path,
            &sk[idx_bytes..],
            &pub_seed_copy,
            0,
            &top_tree_addr,
        )?;
        sk[idx_bytes + 2 * n..idx_bytes + 3 * n].copy_from_slice(&pk[..n]);

        Ok(())
    }

    /// Signs a message by recomputing every layer's auth path from scratch.
    pub fn xmssmt_core_sign(params: &XmssParams, sk: &mut [u8], m: &[u8]) -> XmssResult<Vec<u8>> {
        let n = params.n as usize;
        let idx_bytes = params.index_bytes as usize;
        let mlen = m.len();
        let sig_bytes = params.sig_bytes as usize;

        let sk_seed_start = idx_bytes;
        let sk_prf_start = idx_bytes + n;
        let pub_root_start = idx_bytes + 2 * n;
        let pub_seed_start = idx_bytes + 3 * n;

        let idx = bytes_to_ull(&sk[..idx_bytes]);

        let max_idx = if params.full_height >= 64 {
            u64::MAX
        } else {
            (1u64 << params.full_height) - 1
        };
        if idx > max_idx {
            return Err(Error::KeyExhausted);
        }

        let mut sk_seed = sk[sk_seed_start..sk_seed_start + n].to_vec();
        let mut sk_prf = sk[sk_prf_start..sk_prf_start + n].to_vec();
        let pub_root = sk[pub_root_start..pub_root_start + n].to_vec();
        let pub_seed = sk[pub_seed_start..pub_seed_start + n].to_vec();

        let mut sm = vec![0u8; sig_bytes + mlen];

        let mut ots_addr = [0u32; 8];
        set_type(&mut ots_addr, XMSS_ADDR_TYPE_OTS);

        sm[sig_bytes..].copy_from_slice(m);
        sm[..idx_bytes].copy_from_slice(&sk[..idx_bytes]);

        if idx == max_idx {
            for b in sk[..idx_bytes].iter_mut() {
                *b = 0xFF;
            }
        } else {
            ull_to_bytes(&mut sk[..idx_bytes], idx + 1);
        }

        let mut idx_bytes_32 = [0u8; 32];
        ull_to_bytes(&mut idx_bytes_32, idx);
        prf(
            params,
            &mut sm[idx_bytes..idx_bytes + n],
            &idx_bytes_32,
            &sk_prf,
        )?;

        let mut root = vec![0u8; n];
        let prefix_len = params.padding_len as usize + 3 * n;
        let prefix_start = sig_bytes - prefix_len;
        let r_val = sm[idx_bytes..idx_bytes + n].to_vec();
        hash_message(
            params,
            &mut root,
            &r_val,
            &pub_root,
            idx,
            &mut sm[prefix_start..],
            mlen as u64,
        )?;

        let mut sm_offset = idx_bytes + n;

        for i in 0..params.d {
            let idx_leaf = (idx >> (params.tree_height * i)) & ((1u64 << params.tree_height) - 1);
            #[allow(clippy::cast_possible_truncation)]
            let idx_leaf = idx_leaf as u32;
            let tree_idx = idx >> (params.tree_height * (i + 1));

            set_layer_addr(&mut ots_addr, i);
            set_tree_addr(&mut ots_addr, tree_idx);
            set_ots_addr(&mut ots_addr, idx_leaf);

            wots_sign(
                params,
                &mut sm[sm_offset..],
                &root,
                &sk_seed,
                &pub_seed,
                &mut ots_addr,
            )?;
            sm_offset += params.wots_sig_bytes as usize;

            treehash(
                params,
                &mut root,
                &mut sm[sm_offset..],
                &sk_seed,
                &pub_seed,
                idx_leaf,
                &ots_addr,
            )?;
            sm_offset += params.tree_height as usize * n;
        }

        sk_seed.zeroize();
        sk_prf.zeroize();

        if idx == max_idx {
            #[allow(clippy::cast_possible_truncation)]
            let sk_bytes_len = params.sk_bytes as usize;
            for b in sk[idx_bytes..sk_bytes_len].iter_mut() {
                *b = 0;
            }
        }

        Ok(sm)
    }
}
