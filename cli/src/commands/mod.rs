mod budget;
mod calc;
mod helpers;
mod meal;
mod user;
mod weight;

pub(crate) use budget::{cmd_budget_set, cmd_budget_show, cmd_expense_add, cmd_expense_remove};
pub(crate) use calc::cmd_calc;
pub(crate) use meal::{
    cmd_favorite_add, cmd_favorite_list, cmd_favorite_remove, cmd_meal_add, cmd_meal_import,
    cmd_meal_list, cmd_meal_show, cmd_meal_suggest,
};
pub(crate) use user::{
    cmd_profile_show, cmd_user_add, cmd_user_list, cmd_user_token, cmd_user_update,
};
pub(crate) use weight::{
    cmd_weight_clear, cmd_weight_delete, cmd_weight_export, cmd_weight_history, cmd_weight_import,
    cmd_weight_log,
};
