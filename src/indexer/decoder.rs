use alloy::primitives::{b256, Address, Log, B256};
use alloy::sol;
use alloy::sol_types::SolEvent;

use super::types::{DecodedEvent, EventArgs, EventKind, PoolEvent, RawLog};

// Event layouts of the current pool implementation. Logs are emitted from
// the proxy address but follow the implementation's interface.
sol! {
    event Supply(
        address indexed reserve,
        address user,
        address indexed onBehalfOf,
        uint256 amount,
        uint16 indexed referralCode
    );

    event Withdraw(
        address indexed reserve,
        address indexed user,
        address indexed to,
        uint256 amount
    );

    event Borrow(
        address indexed reserve,
        address user,
        address indexed onBehalfOf,
        uint256 amount,
        uint8 interestRateMode,
        uint256 borrowRate,
        uint16 indexed referralCode
    );

    event Repay(
        address indexed reserve,
        address indexed user,
        address indexed repayer,
        uint256 amount,
        bool useATokens
    );

    event LiquidationCall(
        address indexed collateralAsset,
        address indexed debtAsset,
        address indexed user,
        uint256 debtToCover,
        uint256 liquidatedCollateralAmount,
        address liquidator,
        bool receiveAToken
    );

    event FlashLoan(
        address indexed target,
        address initiator,
        address indexed asset,
        uint256 amount,
        uint8 interestRateMode,
        uint256 premium,
        uint16 indexed referralCode
    );
}

/// topic0 values emitted by the deployed pool, one per tracked kind. Borrow,
/// Repay and FlashLoan use older layouts than the current interface, so logs
/// carrying them only ever decode through the signature match.
pub const DEPLOYED_SIGNATURES: [(B256, EventKind); 6] = [
    (
        b256!("2b627736bca15cd5381dcf80b0bf11fd197d01a037c52b927a881a10fb73ba61"),
        EventKind::Supply,
    ),
    (
        b256!("3115d1449a7b732c986cba18244e897a450f61e1bb8d589cd2e69e6c8924f9f7"),
        EventKind::Withdraw,
    ),
    (
        b256!("c6a898309e823ee50bac40dbae5b8d3b9fede325bbcba08b4a4c1896cd62dfab"),
        EventKind::Borrow,
    ),
    (
        b256!("4cdde6e09bb755c9a5589ebaec640bbfedff1362d4b255ebf8339782b9942faa"),
        EventKind::Repay,
    ),
    (
        b256!("e413a321e8681d831f4dbccbca790d2952b56f977908e45be37335533e005286"),
        EventKind::LiquidationCall,
    ),
    (
        b256!("631042c832b07452973831137f2d73e395028b44b250dedc5abb0ee766e168ac"),
        EventKind::FlashLoan,
    ),
];

fn current_signature(kind: EventKind) -> B256 {
    match kind {
        EventKind::Supply => Supply::SIGNATURE_HASH,
        EventKind::Withdraw => Withdraw::SIGNATURE_HASH,
        EventKind::Borrow => Borrow::SIGNATURE_HASH,
        EventKind::Repay => Repay::SIGNATURE_HASH,
        EventKind::LiquidationCall => LiquidationCall::SIGNATURE_HASH,
        EventKind::FlashLoan => FlashLoan::SIGNATURE_HASH,
    }
}

/// Every topic0 accepted for a kind: current layout first, then the
/// deployed one when it differs.
pub fn signatures_for(kind: EventKind) -> Vec<B256> {
    let mut signatures = vec![current_signature(kind)];
    for (signature, deployed_kind) in DEPLOYED_SIGNATURES {
        if deployed_kind == kind && !signatures.contains(&signature) {
            signatures.push(signature);
        }
    }
    signatures
}

/// Map a topic0 onto one of the tracked kinds.
pub fn kind_for_signature(signature: &B256) -> Option<EventKind> {
    EventKind::ALL
        .into_iter()
        .find(|kind| signatures_for(*kind).contains(signature))
}

/// Decode a raw log into a tracked event.
///
/// Tries a structured decode against every current event layout first. If
/// none matches, falls back to a topic0 lookup that yields a minimal event.
/// Returns `None` for logs whose signature is not tracked.
pub fn decode(raw: &RawLog) -> Option<DecodedEvent> {
    match decode_structured(raw) {
        Some(event) => Some(DecodedEvent {
            kind: event.kind(),
            address: raw.address,
            args: EventArgs::Structured(event),
            block_number: raw.block_number,
            transaction_hash: raw.transaction_hash,
            log_index: raw.log_index,
        }),
        None => decode_minimal(raw),
    }
}

fn decode_structured(raw: &RawLog) -> Option<PoolEvent> {
    let log = Log::new_unchecked(raw.address, raw.topics.clone(), raw.data.clone());

    if let Ok(e) = Supply::decode_log(&log) {
        return Some(PoolEvent::Supply {
            reserve: e.reserve,
            user: e.user,
            on_behalf_of: e.onBehalfOf,
            amount: e.amount,
            referral_code: e.referralCode,
        });
    }
    if let Ok(e) = Withdraw::decode_log(&log) {
        return Some(PoolEvent::Withdraw {
            reserve: e.reserve,
            user: e.user,
            to: e.to,
            amount: e.amount,
        });
    }
    if let Ok(e) = Borrow::decode_log(&log) {
        return Some(PoolEvent::Borrow {
            reserve: e.reserve,
            user: e.user,
            on_behalf_of: e.onBehalfOf,
            amount: e.amount,
            interest_rate_mode: e.interestRateMode,
            borrow_rate: e.borrowRate,
            referral_code: e.referralCode,
        });
    }
    if let Ok(e) = Repay::decode_log(&log) {
        return Some(PoolEvent::Repay {
            reserve: e.reserve,
            user: e.user,
            repayer: e.repayer,
            amount: e.amount,
            use_a_tokens: e.useATokens,
        });
    }
    if let Ok(e) = LiquidationCall::decode_log(&log) {
        return Some(PoolEvent::LiquidationCall {
            collateral_asset: e.collateralAsset,
            debt_asset: e.debtAsset,
            user: e.user,
            debt_to_cover: e.debtToCover,
            liquidated_collateral_amount: e.liquidatedCollateralAmount,
            liquidator: e.liquidator,
            receive_a_token: e.receiveAToken,
        });
    }
    if let Ok(e) = FlashLoan::decode_log(&log) {
        return Some(PoolEvent::FlashLoan {
            target: e.target,
            initiator: e.initiator,
            asset: e.asset,
            amount: e.amount,
            interest_rate_mode: e.interestRateMode,
            premium: e.premium,
            referral_code: e.referralCode,
        });
    }
    None
}

fn decode_minimal(raw: &RawLog) -> Option<DecodedEvent> {
    let kind = kind_for_signature(raw.topics.first()?)?;

    // For the tracked kinds the first indexed parameter is always an
    // address, so the low 20 bytes of topic1 are taken as-is.
    let address = raw.topics.get(1).map(|topic| Address::from_word(*topic));

    tracing::debug!(
        kind = %kind,
        block = raw.block_number,
        tx = %raw.transaction_hash,
        "Structured decode failed, using signature match"
    );

    Some(DecodedEvent {
        kind,
        address: raw.address,
        args: EventArgs::Minimal { address },
        block_number: raw.block_number,
        transaction_hash: raw.transaction_hash,
        log_index: raw.log_index,
    })
}
