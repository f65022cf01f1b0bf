pub mod order_fields;
pub mod order_histories;
pub mod orders;
pub mod payment_histories;
pub mod payments;

pub use order_fields::Entity as OrderFields;
pub use order_histories::Entity as OrderHistories;
pub use orders::Entity as Orders;
pub use payment_histories::Entity as PaymentHistories;
pub use payments::Entity as Payments;
