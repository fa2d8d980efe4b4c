//! Compile-time bindings of the protocol contract interfaces.
//!
//! Only the functions the SDK encodes or decodes are bound, argument
//! positions follow the published proxy interfaces.

#[allow(clippy::too_many_arguments)]
pub mod system {
    alloy::sol!(
        /// Core system proxy: accounts, collateral, pools, debt.
        #[derive(Debug)]
        interface CoreProxy {
            event AccountCreated(uint128 indexed accountId, address indexed owner);

            function createAccount() external returns (uint128 accountId);
            function deposit(uint128 accountId, address collateralType, uint256 tokenAmount) external;
            function withdraw(uint128 accountId, address collateralType, uint256 tokenAmount) external;
            function delegateCollateral(
                uint128 accountId,
                uint128 poolId,
                address collateralType,
                uint256 amount,
                uint256 leverage
            ) external;
            function mintUsd(uint128 accountId, uint128 poolId, address collateralType, uint256 amount) external;
            function burnUsd(uint128 accountId, uint128 poolId, address collateralType, uint256 amount) external;

            function getAccountCollateral(uint128 accountId, address collateralType)
                external
                view
                returns (uint256 totalDeposited, uint256 totalAssigned, uint256 totalLocked);
            function getAccountAvailableCollateral(uint128 accountId, address collateralType)
                external
                view
                returns (uint256 amountD18);
            function getPositionCollateral(uint128 accountId, uint128 poolId, address collateralType)
                external
                view
                returns (uint256 collateralAmountD18);
            function getPositionDebt(uint128 accountId, uint128 poolId, address collateralType)
                external
                returns (int256 debtD18);
            function getCollateralPrice(address collateralType) external view returns (uint256 priceD18);
            function getAccountLastInteraction(uint128 accountId) external view returns (uint256 timestamp);
        }
    );

    alloy::sol!(
        /// Account NFT proxy (ERC-721 enumerable subset).
        #[derive(Debug)]
        interface AccountProxy {
            function balanceOf(address owner) external view returns (uint256 balance);
            function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256 tokenId);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod perps {
    alloy::sol!(
        /// Perpetual futures market proxy.
        #[derive(Debug)]
        interface PerpsMarketProxy {
            struct OrderCommitmentRequest {
                uint128 marketId;
                uint128 accountId;
                int128 sizeDelta;
                uint128 settlementStrategyId;
                uint256 acceptablePrice;
                bytes32 trackingCode;
                address referrer;
            }

            struct AsyncOrder {
                uint256 commitmentTime;
                OrderCommitmentRequest request;
            }

            struct MarketSummary {
                int256 skew;
                uint256 size;
                uint256 maxOpenInterest;
                int256 currentFundingRate;
                int256 currentFundingVelocity;
                uint256 indexPrice;
            }

            struct SettlementStrategy {
                uint8 strategyType;
                uint256 settlementDelay;
                uint256 settlementWindowDuration;
                address priceVerificationContract;
                bytes32 feedId;
                uint256 settlementReward;
                bool disabled;
                uint256 commitmentPriceDelay;
            }

            function createAccount() external returns (uint128 accountId);
            function commitOrder(OrderCommitmentRequest calldata commitment)
                external
                returns (AsyncOrder memory retOrder, uint256 fees);
            function settleOrder(uint128 accountId) external;
            function modifyCollateral(uint128 accountId, uint128 synthMarketId, int256 amountDelta) external;

            function getOrder(uint128 accountId) external view returns (AsyncOrder memory order);
            function getMarketSummary(uint128 marketId) external view returns (MarketSummary memory summary);
            function getAvailableMargin(uint128 accountId) external view returns (int256 availableMargin);
            function getRequiredMargins(uint128 accountId)
                external
                view
                returns (
                    uint256 requiredInitialMargin,
                    uint256 requiredMaintenanceMargin,
                    uint256 maxLiquidationReward
                );
            function totalCollateralValue(uint128 accountId) external view returns (uint256 totalValue);
            function getOpenPosition(uint128 accountId, uint128 marketId)
                external
                view
                returns (int256 totalPnl, int256 accruedFunding, int128 positionSize, uint256 owedInterest);
            function getMarkets() external view returns (uint256[] memory marketIds);
            function getSettlementStrategy(uint128 marketId, uint256 strategyId)
                external
                view
                returns (SettlementStrategy memory settlementStrategy);
            function getCollateralAmount(uint128 accountId, uint128 synthMarketId)
                external
                view
                returns (uint256 amount);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod spot {
    alloy::sol!(
        /// Spot synth market proxy.
        #[derive(Debug)]
        interface SpotMarketProxy {
            struct OrderFees {
                uint256 fixedFees;
                uint256 utilizationFees;
                int256 skewFees;
                int256 wrapperFees;
            }

            struct SettlementStrategy {
                uint8 strategyType;
                uint256 settlementDelay;
                uint256 settlementWindowDuration;
                address priceVerificationContract;
                bytes32 feedId;
                string url;
                uint256 settlementReward;
                uint256 priceDeviationTolerance;
                uint256 minimumUsdExchangeAmount;
                uint256 maxRoundingLoss;
                bool disabled;
            }

            function wrap(uint128 marketId, uint256 wrapAmount, uint256 minAmountReceived)
                external
                returns (uint256 amountToMint, OrderFees memory fees);
            function sell(uint128 marketId, uint256 synthAmount, uint256 minUsdAmount, address referrer)
                external
                returns (uint256 usdAmountReceived, OrderFees memory fees);

            function getPriceData(uint128 synthMarketId)
                external
                view
                returns (bytes32 buyFeedId, bytes32 sellFeedId, uint256 strictPriceStalenessTolerance);
            function getSettlementStrategy(uint128 marketId, uint256 strategyId)
                external
                view
                returns (SettlementStrategy memory settlementStrategy);
        }
    );
}

pub mod multicall {
    alloy::sol!(
        /// Trusted multicall forwarder. Unlike Multicall3 the per-call flag
        /// is `requireSuccess`, the ABI types are identical.
        #[derive(Debug)]
        interface TrustedMulticallForwarder {
            struct Call3Value {
                address target;
                bool requireSuccess;
                uint256 value;
                bytes callData;
            }

            struct Result {
                bool success;
                bytes returnData;
            }

            function aggregate3Value(Call3Value[] calldata calls)
                external
                payable
                returns (Result[] memory returnData);
        }
    );
}

pub mod oracle {
    alloy::sol!(
        /// ERC-7412 wrapper around the Pyth price feeds.
        #[derive(Debug)]
        interface PythERC7412Wrapper {
            function getLatestPrice(bytes32 priceId, uint256 stalenessTolerance)
                external
                view
                returns (int256 price);
            function fulfillOracleQuery(bytes calldata signedOffchainData) external payable;
        }
    );
}

pub mod token {
    alloy::sol!(
        #[derive(Debug)]
        interface ERC20 {
            function balanceOf(address account) external view returns (uint256 balance);
            function allowance(address owner, address spender) external view returns (uint256 remaining);
            function approve(address spender, uint256 amount) external returns (bool success);
        }
    );

    alloy::sol!(
        #[derive(Debug)]
        interface WETH {
            function deposit() external payable;
        }
    );
}

pub mod errors {
    alloy::sol!(
        /// Custom errors the protocol contracts revert with, including the
        /// ERC-7412 oracle data requests.
        #[derive(Debug)]
        interface Synthetix {
            error OracleDataRequired(address oracleContract, bytes oracleQuery);
            error FeeRequired(uint256 feeAmount);
            error Unauthorized(address addr);
            error PermissionDenied(uint128 accountId, bytes32 permission, address target);
            error AccountNotFound(uint128 accountId);
            error InsufficientAccountCollateral(uint256 amount);
            error InsufficientAllowance(uint256 required, uint256 existing);
            error InsufficientMargin(int256 availableMargin, uint256 minMargin);
            error InvalidCollateralAmount();
            error OrderNotValid();
            error SettlementWindowExpired(uint256 timestamp, uint256 settlementTime, uint256 settlementExpiration);
            error SettlementWindowNotOpen(uint256 timestamp, uint256 settlementTime);
        }
    );
}
