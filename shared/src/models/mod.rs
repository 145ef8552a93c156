//! Storefront data models shared between the checkout server and its clients

pub mod address;
pub mod cart;
pub mod order;

pub use address::{Address, AddressInput, NewAddress};
pub use cart::{
    AddCartItemRequest, CartEntry, CartItemKey, CartView, InvalidCartItemKey, MAX_CART_QUANTITY,
    RemoveCartItemRequest, UpdateCartItemRequest,
};
pub use order::{
    CheckoutReceipt, CreateOrderRequest, Order, OrderDetail, OrderItem, OrderStatus,
    UnknownOrderStatus, UpdateOrderStatusRequest,
};
